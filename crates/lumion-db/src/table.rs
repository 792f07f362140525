//! In-memory tables and the multi-encoding loader.
//!
//! Artifact tables have loose, pipeline-dependent schemas, so rows are kept
//! as JSON objects and columns are only an ordered list of names. A table
//! that could not be loaded is [`LoadedTable::Absent`], which is distinct
//! from a present table with zero rows.
//!
//! ## Load order
//!
//! For a logical name such as `create_final_text_units`:
//!
//! 1. `create_final_text_units.parquet` (what indexing runs write)
//! 2. `create_final_text_units.arrow` (Arrow IPC file)
//! 3. `create_final_text_units.json` (JSON lines, or one JSON array)
//! 4. `create_final_text_units.csv` (header row required)
//!
//! The first encoding that decodes wins. Saving writes Parquet and JSON.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::codec;
use crate::error::DbResult;

/// A single table row.
pub type Row = Map<String, Value>;

// ============================================================================
// TableEncoding
// ============================================================================

/// On-disk encodings a table may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableEncoding {
    /// Parquet, the columnar binary encoding of indexing runs.
    Parquet,
    /// Arrow IPC file.
    Arrow,
    /// Line-delimited JSON records.
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

impl TableEncoding {
    /// Encodings in the order the loader tries them.
    pub const LOAD_ORDER: [TableEncoding; 4] = [Self::Parquet, Self::Arrow, Self::Json, Self::Csv];

    /// File extension for this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Arrow => "arrow",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Path of `logical_name` in this encoding inside `dir`.
    pub fn path_in(&self, dir: &Path, logical_name: &str) -> PathBuf {
        dir.join(format!("{}.{}", logical_name, self.extension()))
    }
}

impl fmt::Display for TableEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// Table
// ============================================================================

/// A loaded table: ordered column names and JSON-object rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create a table with an explicit column order.
    ///
    /// Keys present in rows but missing from `columns` are appended.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self { columns, rows };
        table.register_row_keys();
        table
    }

    /// Create a table whose columns are the row keys in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(Vec::new(), rows)
    }

    fn register_row_keys(&mut self) {
        for row in &self.rows {
            for key in row.keys() {
                if !self.columns.iter().any(|c| c == key) {
                    self.columns.push(key.clone());
                }
            }
        }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has zero rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `name` is one of the table's columns.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// The first of `candidates` that is a column of this table.
    pub fn first_present_column(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .find(|c| self.has_column(c))
            .map(|c| c.to_string())
    }

    /// Value of `column` in row `index`, if both exist and it is not null.
    pub fn get(&self, index: usize, column: &str) -> Option<&Value> {
        self.rows
            .get(index)
            .and_then(|row| row.get(column))
            .filter(|v| !v.is_null())
    }

    /// Replace (or add) `column` with one value per row.
    ///
    /// Rows beyond the end of `values` receive `null`.
    pub fn with_column(mut self, column: &str, values: Vec<Value>) -> Self {
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(column.to_string(), values.next().unwrap_or(Value::Null));
        }
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        self
    }
}

// ============================================================================
// LoadedTable
// ============================================================================

/// Result of loading a table: present with its encoding, or absent.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedTable {
    /// The table decoded from one of the supported encodings.
    Present {
        table: Table,
        encoding: TableEncoding,
    },
    /// No encoding could be loaded (or there was no artifact directory).
    Absent,
}

impl LoadedTable {
    /// The table, if it was loaded.
    pub fn table(&self) -> Option<&Table> {
        match self {
            Self::Present { table, .. } => Some(table),
            Self::Absent => None,
        }
    }

    /// Whether the table was loaded (possibly with zero rows).
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// The encoding the table was loaded from.
    pub fn encoding(&self) -> Option<TableEncoding> {
        match self {
            Self::Present { encoding, .. } => Some(*encoding),
            Self::Absent => None,
        }
    }

    /// Row count, or `None` when absent.
    pub fn row_count(&self) -> Option<usize> {
        self.table().map(Table::len)
    }
}

// ============================================================================
// Load / save
// ============================================================================

/// Load `logical_name` from `artifact_dir`, trying every encoding in order.
///
/// Never fails: every decoding problem degrades to [`LoadedTable::Absent`].
pub fn load_table(artifact_dir: Option<&Path>, logical_name: &str) -> LoadedTable {
    let Some(dir) = artifact_dir else {
        debug!("No artifact directory; '{}' is absent", logical_name);
        return LoadedTable::Absent;
    };

    for encoding in TableEncoding::LOAD_ORDER {
        let path = encoding.path_in(dir, logical_name);
        match load_encoding(&path, encoding) {
            Ok(table) => {
                debug!(
                    "Loaded '{}' from {} ({} rows)",
                    logical_name,
                    path.display(),
                    table.len()
                );
                return LoadedTable::Present { table, encoding };
            }
            Err(e) => debug!("'{}' not loadable as {}: {}", logical_name, encoding, e),
        }
    }

    LoadedTable::Absent
}

fn load_encoding(path: &Path, encoding: TableEncoding) -> DbResult<Table> {
    match encoding {
        TableEncoding::Parquet => codec::read_parquet(path),
        TableEncoding::Arrow => codec::read_arrow(path),
        TableEncoding::Json => codec::read_json(path),
        TableEncoding::Csv => codec::read_csv(path),
    }
}

/// Persist `table` as both the Parquet and JSON-lines encodings.
///
/// Both files are fully written to temp files before either replaces its
/// destination, so a failed write leaves the existing files untouched.
pub fn save_table(artifact_dir: &Path, logical_name: &str, table: &Table) -> DbResult<()> {
    let batch = codec::encode_batch(logical_name, table)?;
    let parquet = codec::stage_parquet(&TableEncoding::Parquet.path_in(artifact_dir, logical_name), &batch)?;
    let json = codec::stage_json_lines(&TableEncoding::Json.path_in(artifact_dir, logical_name), table)?;
    parquet.commit()?;
    json.commit()?;
    info!(
        "Saved '{}' ({} rows) to {}",
        logical_name,
        table.len(),
        artifact_dir.display()
    );
    Ok(())
}
