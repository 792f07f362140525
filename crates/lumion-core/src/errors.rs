//! Error types for lumion-core.
//!
//! Search never fails: missing artifacts degrade to empty results. Errors
//! only come out of configuration loading and the engine constructors.

use thiserror::Error;

/// Result type alias for lumion-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Domain-specific errors for Lumion operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration file exists but could not be read or parsed.
    #[error("Config invalid: {0}")]
    InvalidConfig(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },
}
