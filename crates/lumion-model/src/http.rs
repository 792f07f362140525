//! Shared blocking HTTP plumbing for providers.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::trace;

use crate::error::{ModelError, ModelResult};

/// Build a blocking client with the configured timeout.
pub(crate) fn build_client(provider: &str, timeout_secs: u64) -> ModelResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ModelError::http(provider, e.to_string()))
}

/// Header carrying the Gemini API key; keys never go into the URL.
pub(crate) const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

/// POST a JSON body and parse the JSON response.
///
/// Non-2xx statuses become [`ModelError::Status`] with the response body.
/// Transport errors are reported without the request URL.
pub(crate) fn post_json(
    client: &Client,
    provider: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: &Value,
) -> ModelResult<Value> {
    trace!("POST {} ({})", url, provider);

    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ModelError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .map_err(|e| ModelError::malformed(provider, e.without_url().to_string()))
}

fn transport_error(provider: &str, e: reqwest::Error) -> ModelError {
    ModelError::http(provider, e.without_url().to_string())
}
