//! Text completion models used for graph extraction.

use std::fmt;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::error::{ModelError, ModelResult};
use crate::http::{build_client, post_json, GEMINI_KEY_HEADER};

/// A model that turns a prompt into text.
pub trait CompletionModel: Send + Sync + fmt::Debug {
    /// Model identifier for logs.
    fn name(&self) -> &str;

    /// Complete `prompt` and return the raw text.
    fn complete(&self, prompt: &str) -> ModelResult<String>;
}

/// Gemini `generateContent` completion.
pub struct GeminiCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiCompletion")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiCompletion {
    pub fn new(config: &ProviderConfig) -> ModelResult<Self> {
        let api_key = config
            .gemini_key()
            .ok_or_else(|| ModelError::not_configured("gemini", "GEMINI_API_KEY is not set"))?;
        Ok(Self {
            client: build_client("gemini", config.timeout_secs)?,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.gemini_completion_model.clone(),
        })
    }
}

impl CompletionModel for GeminiCompletion {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> ModelResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let response = post_json(
            &self.client,
            "gemini",
            &url,
            &[(GEMINI_KEY_HEADER, self.api_key.as_str())],
            &body,
        )?;
        extract_completion_text(&response)
            .ok_or_else(|| ModelError::malformed("gemini", "no candidate text in response"))
    }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_completion_text(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
