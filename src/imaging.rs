use async_trait::async_trait;
use serde::Serialize;

use crate::error::ChatError;

pub const IMAGE_SUCCESS_TEXT: &str = "Visual synthesis complete for your request.";
pub const IMAGE_FAILURE_TEXT: &str = "Image generation service failed. Check your settings URL.";

/// Response fields that may carry the image reference, in priority order.
const RESULT_FIELDS: &[&str] = &["url", "image", "output"];

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Image reference produced for `prompt`, `None` when the reply had none.
    async fn generate(&self, endpoint: &str, prompt: &str) -> Result<Option<String>, ChatError>;
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

/// First accepted field holding a non-empty string.
pub fn extract_reference(body: &serde_json::Value) -> Option<String> {
    RESULT_FIELDS
        .iter()
        .filter_map(|field| body.get(*field)?.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// User-configured webhook taking `{prompt}` as JSON.
pub struct HttpImageService {
    client: reqwest::Client,
}

impl HttpImageService {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageService for HttpImageService {
    async fn generate(&self, endpoint: &str, prompt: &str) -> Result<Option<String>, ChatError> {
        let resp = self
            .client
            .post(endpoint)
            .json(&ImageRequest { prompt })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        reference_from_reply(status, body)
    }
}

/// A reference in the body is accepted whatever the status code. Without
/// one, a non-success status is reported as an API error.
fn reference_from_reply(status: reqwest::StatusCode, body: String) -> Result<Option<String>, ChatError> {
    let parsed = serde_json::from_str::<serde_json::Value>(&body);
    if let Some(reference) = parsed.as_ref().ok().and_then(extract_reference) {
        return Ok(Some(reference));
    }
    if !status.is_success() {
        return Err(ChatError::Api { status, body });
    }
    Ok(extract_reference(&parsed?))
}
