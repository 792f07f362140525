//! # lumion-model
//!
//! Remote model providers for Lumion: text embeddings and text completion.
//!
//! ## Modules
//!
//! - `config`: [`ProviderConfig`] and environment overrides
//! - `embedding`: [`EmbeddingProvider`], Gemini/Ollama backends and the [`EmbeddingChain`]
//! - `llm`: [`CompletionModel`] and the Gemini implementation
//! - `error`: [`ModelError`]
//!
//! Every network call is blocking with a configured timeout.

pub mod config;
pub mod embedding;
pub mod error;
mod http;
pub mod llm;

pub use config::ProviderConfig;
pub use embedding::{
    extract_vector, Embedding, EmbeddingChain, EmbeddingProvider, GeminiEmbedder, OllamaEmbedder,
};
pub use error::{ModelError, ModelResult};
pub use llm::{extract_completion_text, CompletionModel, GeminiCompletion};

/// Create the completion model for graph extraction, if a key is configured.
pub fn create_completion_model(config: &ProviderConfig) -> ModelResult<Option<Box<dyn CompletionModel>>> {
    if config.gemini_key().is_none() {
        return Ok(None);
    }
    Ok(Some(Box::new(GeminiCompletion::new(config)?)))
}
