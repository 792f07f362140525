//! Error types for lumion-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lumion-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in lumion-db operations.
///
/// Loading never surfaces these to callers (a failed load is an absent
/// table); they are produced by the individual codecs and by persistence.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Artifact errors
    // ========================================================================
    /// The table file for an encoding does not exist.
    #[error("Table file not found: {path}")]
    TableNotFound { path: PathBuf },

    /// A table file exists but its contents could not be decoded.
    #[error("Failed to decode table at {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// A table could not be converted into a record batch for persistence.
    #[error("Failed to encode table '{table}': {message}")]
    Encode { table: String, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Arrow error wrapper.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error wrapper.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    /// Create a decode error.
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an encode error.
    pub fn encode(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            table: table.into(),
            message: message.into(),
        }
    }
}
