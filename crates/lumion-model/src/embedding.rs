//! Embedding providers and the ordered fallback chain.
//!
//! Each provider turns one text into a vector or an error. The
//! [`EmbeddingChain`] tries providers in priority order and folds every
//! failure into [`Embedding::Unavailable`]; it never returns an error.
//!
//! Backends disagree on where the vector lives in the response, so every
//! provider goes through [`extract_vector`]:
//!
//! | Backend            | Shape                                   |
//! |--------------------|-----------------------------------------|
//! | Gemini             | `{"embedding": {"values": [...]}}`      |
//! | Ollama (legacy)    | `{"embedding": [...]}`                  |
//! | Ollama `/api/embed`| `{"embeddings": [[...]]}`               |
//! | OpenAI-compatible  | `{"data": [{"embedding": [...]}]}`      |

use std::fmt;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ModelError, ModelResult};
use crate::http::{build_client, post_json, GEMINI_KEY_HEADER};

// ============================================================================
// Embedding
// ============================================================================

/// Outcome of embedding a text through the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    /// A vector from the first provider that succeeded.
    Vector(Vec<f32>),
    /// No provider configured, or every provider failed.
    Unavailable,
}

impl Embedding {
    /// The vector, or an empty slice when unavailable.
    pub fn as_slice(&self) -> &[f32] {
        match self {
            Self::Vector(v) => v,
            Self::Unavailable => &[],
        }
    }

    /// Whether a vector is present.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Vector(_))
    }

    /// Take the vector, if any.
    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            Self::Vector(v) => Some(v),
            Self::Unavailable => None,
        }
    }
}

// ============================================================================
// EmbeddingProvider trait
// ============================================================================

/// A single embedding backend.
///
/// Implementations must be `Send + Sync` so one chain can serve concurrent
/// requests.
pub trait EmbeddingProvider: Send + Sync + fmt::Debug {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Embed one text.
    fn embed(&self, text: &str) -> ModelResult<Vec<f32>>;
}

/// Pull a float vector out of any supported response shape.
///
/// Returns `None` for missing, empty or non-numeric vectors.
pub fn extract_vector(value: &Value) -> Option<Vec<f32>> {
    let candidate = value
        .get("embedding")
        .map(|e| e.get("values").unwrap_or(e))
        .or_else(|| {
            value.get("embeddings").and_then(|e| e.get(0)).map(|first| first.get("values").unwrap_or(first))
        })
        .or_else(|| value.get("data").and_then(|d| d.get(0)).and_then(|d| d.get("embedding")))
        .unwrap_or(value);

    let items = candidate.as_array()?;
    let vector: Option<Vec<f32>> = items.iter().map(|v| v.as_f64().map(|f| f as f32)).collect();
    vector.filter(|v| !v.is_empty())
}

// ============================================================================
// Gemini
// ============================================================================

/// Gemini `embedContent` provider (API-key authenticated).
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiEmbedder {
    /// Create the provider from configuration.
    pub fn new(config: &ProviderConfig) -> ModelResult<Self> {
        let api_key = config
            .gemini_key()
            .ok_or_else(|| ModelError::not_configured("gemini", "GEMINI_API_KEY is not set"))?;
        Ok(Self {
            client: build_client("gemini", config.timeout_secs)?,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.gemini_embedding_model.clone(),
        })
    }
}

impl EmbeddingProvider for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini"
    }

    fn embed(&self, text: &str) -> ModelResult<Vec<f32>> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });
        let response = post_json(
            &self.client,
            self.name(),
            &url,
            &[(GEMINI_KEY_HEADER, self.api_key.as_str())],
            &body,
        )?;
        extract_vector(&response)
            .ok_or_else(|| ModelError::malformed(self.name(), "no embedding vector in response"))
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama `/api/embeddings` provider.
#[derive(Debug)]
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Create the provider from configuration.
    pub fn new(config: &ProviderConfig) -> ModelResult<Self> {
        let url = config
            .ollama_base_url()
            .ok_or_else(|| ModelError::not_configured("ollama", "OLLAMA_URL is not set"))?;
        Ok(Self {
            client: build_client("ollama", config.timeout_secs)?,
            url: url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
        })
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    fn embed(&self, text: &str) -> ModelResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.url);
        let body = json!({ "model": self.model, "prompt": text });
        let response = post_json(&self.client, self.name(), &url, &[], &body)?;
        extract_vector(&response)
            .ok_or_else(|| ModelError::malformed(self.name(), "no embedding vector in response"))
    }
}

// ============================================================================
// EmbeddingChain
// ============================================================================

/// Providers tried in priority order.
#[derive(Debug, Default)]
pub struct EmbeddingChain {
    providers: Vec<Box<dyn EmbeddingProvider>>,
}

impl EmbeddingChain {
    /// Create a chain from explicit providers (first = highest priority).
    pub fn new(providers: Vec<Box<dyn EmbeddingProvider>>) -> Self {
        Self { providers }
    }

    /// A chain with no providers; every call is `Unavailable`.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the chain from configuration: Gemini first, then Ollama.
    ///
    /// Providers whose client cannot be constructed are skipped with a warning.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut providers: Vec<Box<dyn EmbeddingProvider>> = Vec::new();

        if config.gemini_key().is_some() {
            match GeminiEmbedder::new(config) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => warn!("Skipping Gemini embeddings: {}", e),
            }
        }
        if config.ollama_base_url().is_some() {
            match OllamaEmbedder::new(config) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => warn!("Skipping Ollama embeddings: {}", e),
            }
        }

        debug!("Embedding chain: {} provider(s)", providers.len());
        Self { providers }
    }

    /// Whether at least one provider is present.
    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Names of the providers in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Embed `text` with the first provider that succeeds.
    pub fn embed(&self, text: &str) -> Embedding {
        for provider in &self.providers {
            match provider.embed(text) {
                Ok(vector) if !vector.is_empty() => return Embedding::Vector(vector),
                Ok(_) => debug!("Provider '{}' returned an empty vector", provider.name()),
                Err(e) => warn!("Embedding provider '{}' failed: {}", provider.name(), e),
            }
        }
        Embedding::Unavailable
    }
}
