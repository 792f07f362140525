//! Provider configuration.
//!
//! A provider is "configured" when its credential or endpoint is present:
//! Gemini needs an API key, Ollama needs a base URL. Empty strings count as
//! absent, so `GEMINI_API_KEY=""` disables Gemini.

use serde::{Deserialize, Serialize};

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the Ollama base URL.
pub const OLLAMA_URL_ENV: &str = "OLLAMA_URL";

/// Environment variable overriding the Ollama embedding model.
pub const OLLAMA_MODEL_ENV: &str = "OLLAMA_MODEL";

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini embedding model.
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Default Gemini model for graph extraction.
pub const DEFAULT_GEMINI_COMPLETION_MODEL: &str = "gemini-1.5-flash";

/// Default Ollama embedding model.
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

/// Default HTTP timeout for provider calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for embedding and completion providers.
///
/// # Example YAML
///
/// ```yaml
/// providers:
///   geminiApiKey: "..."
///   ollamaUrl: http://localhost:11434
///   ollamaModel: nomic-embed-text
///   timeoutSecs: 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Gemini API key (provider A).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    /// Gemini REST base URL.
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Gemini embedding model.
    #[serde(default = "default_gemini_embedding_model")]
    pub gemini_embedding_model: String,

    /// Gemini model used for graph extraction.
    #[serde(default = "default_gemini_completion_model")]
    pub gemini_completion_model: String,

    /// Ollama base URL (provider B).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,

    /// Ollama embedding model.
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_gemini_embedding_model() -> String {
    DEFAULT_GEMINI_EMBEDDING_MODEL.to_string()
}

fn default_gemini_completion_model() -> String {
    DEFAULT_GEMINI_COMPLETION_MODEL.to_string()
}

fn default_ollama_model() -> String {
    DEFAULT_OLLAMA_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: default_gemini_base_url(),
            gemini_embedding_model: default_gemini_embedding_model(),
            gemini_completion_model: default_gemini_completion_model(),
            ollama_url: None,
            ollama_model: default_ollama_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a closure so tests don't touch the process env.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(GEMINI_API_KEY_ENV) {
            self.gemini_api_key = Some(key);
        }
        if let Some(url) = lookup(OLLAMA_URL_ENV) {
            self.ollama_url = Some(url);
        }
        if let Some(model) = lookup(OLLAMA_MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.ollama_model = model;
        }
        self
    }

    /// The Gemini API key, if non-empty.
    pub fn gemini_key(&self) -> Option<&str> {
        non_empty(self.gemini_api_key.as_deref())
    }

    /// The Ollama base URL, if non-empty.
    pub fn ollama_base_url(&self) -> Option<&str> {
        non_empty(self.ollama_url.as_deref())
    }

    /// Whether at least one embedding provider is configured.
    pub fn has_embedding_provider(&self) -> bool {
        self.gemini_key().is_some() || self.ollama_base_url().is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
