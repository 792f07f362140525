//! # lumion-db
//!
//! Storage layer for Lumion: finds the active artifact directory written by
//! an indexing run and loads/saves its tables.
//!
//! ## Architecture
//!
//! ```text
//! lumion-cli → lumion-core → lumion-db (artifacts, tables)
//!                          → lumion-model (embeddings, completions)
//! ```
//!
//! ## Modules
//!
//! - `artifacts`: repository root and latest artifact directory discovery
//! - `table`: the [`Table`] model, [`LoadedTable`] and the fallback loader
//! - `codec`: Parquet / Arrow IPC / JSON / CSV readers and staged writers
//!
//! ## Usage
//!
//! ```ignore
//! use lumion_db::{load_table, locate_latest_artifacts};
//! use std::path::Path;
//!
//! let dir = locate_latest_artifacts(Path::new("graphrag-pipeline/output"), Path::new("."));
//! let units = load_table(dir.as_deref(), "create_final_text_units");
//! if let Some(table) = units.table() {
//!     println!("{} text units", table.len());
//! }
//! ```

pub mod artifacts;
pub mod codec;
pub mod error;
pub mod table;

pub use artifacts::{
    discover_repo_root, locate_latest_artifacts, resolve_base_path, ARTIFACTS_SUBDIR, REPO_MARKER,
};
pub use error::{DbError, DbResult};
pub use table::{load_table, save_table, LoadedTable, Row, Table, TableEncoding};
