//! Per-encoding readers and writers.
//!
//! Parquet, Arrow IPC and CSV are decoded into record batches and converted
//! to JSON rows with the Arrow JSON writer; JSON files are parsed directly.
//! Writing goes the other way: rows are serialized into a record batch whose
//! schema is inferred from the rows themselves, then staged next to the
//! destination as `<file>.tmp` and renamed into place on commit.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use tracing::warn;

use crate::error::{DbError, DbResult};
use crate::table::{Row, Table};

// ============================================================================
// Readers
// ============================================================================

/// Read a Parquet file.
pub fn read_parquet(path: &Path) -> DbResult<Table> {
    let file = open_existing(path)?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| DbError::decode(path, e.to_string()))?;
    let columns = column_names(builder.schema());
    let reader = builder.build().map_err(|e| DbError::decode(path, e.to_string()))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::decode(path, e.to_string()))?;

    Ok(Table::new(columns, batches_to_rows(path, &batches)?))
}

/// Read an Arrow IPC file.
pub fn read_arrow(path: &Path) -> DbResult<Table> {
    let file = open_existing(path)?;
    let reader = FileReader::try_new(file, None).map_err(|e| DbError::decode(path, e.to_string()))?;
    let columns = column_names(&reader.schema());

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::decode(path, e.to_string()))?;

    Ok(Table::new(columns, batches_to_rows(path, &batches)?))
}

/// Read JSON records: one object per line, or a single top-level array.
pub fn read_json(path: &Path) -> DbResult<Table> {
    let content = fs::read_to_string(open_path(path)?)?;
    let trimmed = content.trim_start();

    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| DbError::decode(path, e.to_string()))?
    } else {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()
            .map_err(|e| DbError::decode(path, e.to_string()))?
    };

    Ok(Table::from_rows(into_objects(path, values)?))
}

/// Read a CSV file with a header row, inferring column types.
pub fn read_csv(path: &Path) -> DbResult<Table> {
    let mut file = open_existing(path)?;
    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, None)
        .map_err(|e| DbError::decode(path, e.to_string()))?;
    file.rewind()?;

    let columns = column_names(&schema);
    let reader = arrow::csv::ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .build(file)
        .map_err(|e| DbError::decode(path, e.to_string()))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::decode(path, e.to_string()))?;

    Ok(Table::new(columns, batches_to_rows(path, &batches)?))
}

fn open_path(path: &Path) -> DbResult<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(DbError::TableNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn open_existing(path: &Path) -> DbResult<File> {
    Ok(File::open(open_path(path)?)?)
}

fn column_names(schema: &Schema) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().clone()).collect()
}

fn batches_to_rows(path: &Path, batches: &[RecordBatch]) -> DbResult<Vec<Row>> {
    let mut writer = ArrayWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs)?;
    writer.finish()?;

    let buf = writer.into_inner();
    if buf.is_empty() {
        return Ok(Vec::new());
    }
    let values: Vec<Value> = serde_json::from_slice(&buf)?;
    into_objects(path, values)
}

fn into_objects(path: &Path, values: Vec<Value>) -> DbResult<Vec<Row>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(DbError::decode(
                path,
                format!("record {} is not an object: {}", i, other),
            )),
        })
        .collect()
}

// ============================================================================
// Writers
// ============================================================================

/// Convert a table into a single record batch.
///
/// The schema is inferred from the row values; a table without rows becomes
/// an empty batch of nullable string columns so its columns survive.
pub fn encode_batch(table_name: &str, table: &Table) -> DbResult<RecordBatch> {
    if table.is_empty() {
        let fields: Vec<Field> = table
            .columns()
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect();
        return Ok(RecordBatch::new_empty(Arc::new(Schema::new(fields))));
    }

    let values = table
        .rows()
        .iter()
        .map(|row| Ok::<Value, ArrowError>(Value::Object(row.clone())));
    let schema = infer_json_schema_from_iterator(values)
        .map_err(|e| DbError::encode(table_name, e.to_string()))?;

    let mut decoder = arrow::json::ReaderBuilder::new(Arc::new(schema))
        .with_batch_size(table.len())
        .with_coerce_primitive(true)
        .build_decoder()?;
    decoder
        .serialize(table.rows())
        .map_err(|e| DbError::encode(table_name, e.to_string()))?;

    decoder
        .flush()?
        .ok_or_else(|| DbError::encode(table_name, "no rows were decoded"))
}

/// Stage a record batch as a snappy-compressed Parquet file.
pub fn stage_parquet(path: &Path, batch: &RecordBatch) -> DbResult<StagedFile> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    stage(path, |file| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;
        Ok(())
    })
}

/// Stage table rows as JSON lines.
pub fn stage_json_lines(path: &Path, table: &Table) -> DbResult<StagedFile> {
    stage(path, |file| {
        let mut out = BufWriter::new(file);
        for row in table.rows() {
            serde_json::to_writer(&mut out, row)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    })
}

/// A fully written sibling temp file waiting to replace its destination.
///
/// Dropping it without [`StagedFile::commit`] deletes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Rename the temp file over the destination.
    pub fn commit(mut self) -> DbResult<()> {
        fs::rename(&self.tmp, &self.dest)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed || !self.tmp.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(&self.tmp) {
            warn!("Could not remove {}: {}", self.tmp.display(), e);
        }
    }
}

/// `<dir>/<file name>.tmp`, unique per encoding of the same table.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Run `write` against a fresh temp file beside `path`.
///
/// The temp file is removed if `write` fails.
fn stage<F>(path: &Path, write: F) -> DbResult<StagedFile>
where
    F: FnOnce(File) -> DbResult<()>,
{
    let staged = StagedFile {
        tmp: tmp_path(path),
        dest: path.to_path_buf(),
        committed: false,
    };
    write(File::create(&staged.tmp)?)?;
    Ok(staged)
}
