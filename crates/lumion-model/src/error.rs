//! Error types for lumion-model.
//!
//! Provider errors never escape the embedding chain: they are logged and the
//! next provider is tried. They do reach callers of a single provider or of
//! a [`crate::CompletionModel`], which decide how to degrade.

use thiserror::Error;

/// Result type alias for lumion-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in lumion-model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Provider errors
    // ========================================================================
    /// Provider is missing required configuration (API key, URL).
    #[error("Provider '{provider}' is not configured: {reason}")]
    ProviderNotConfigured { provider: String, reason: String },

    /// Request could not be sent or the connection failed.
    #[error("Request to '{provider}' failed: {message}")]
    Http { provider: String, message: String },

    /// Provider answered with a non-success status.
    #[error("Provider '{provider}' returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// Provider answered with a body we could not interpret.
    #[error("Malformed response from '{provider}': {message}")]
    MalformedResponse { provider: String, message: String },
}

impl ModelError {
    /// Create an HTTP error.
    pub fn http(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a not-configured error.
    pub fn not_configured(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderNotConfigured {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}
