use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{InsightError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub response_schema: Value,
}

/// External text-generation service bounded by a response schema.
#[async_trait]
pub trait GenerativeCollaborator: Send + Sync {
    /// Returns the raw reply text; parsing it is the caller's job.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

pub struct GeminiCollaborator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiCollaborator {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    fn build_request(&self, request: &GenerationRequest) -> reqwest::RequestBuilder {
        self.client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
    }
}

#[async_trait]
impl GenerativeCollaborator for GeminiCollaborator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(model = %self.model, prompt_chars = request.prompt.len(), "calling generateContent");

        let resp = self.build_request(request).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        extract_candidate_text(&parse_envelope(&text)?)
    }
}

pub fn request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema
        }
    })
}

/// Maps a non-success reply to a transport error, preferring the provider's own message.
pub fn status_error(status: StatusCode, body: &str) -> InsightError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string());
    InsightError::Transport(format!("collaborator returned {}: {}", status, message))
}

pub fn parse_envelope(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| InsightError::Transport(format!("malformed collaborator envelope: {}", e)))
}

/// Pulls the first candidate's text out of a `generateContent` response.
pub fn extract_candidate_text(envelope: &Value) -> Result<String> {
    if let Some(reason) = envelope["promptFeedback"]["blockReason"].as_str() {
        return Err(InsightError::Transport(format!("prompt blocked: {}", reason)));
    }

    let candidate = envelope["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| InsightError::Transport("response has no candidates".to_string()))?;

    let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        InsightError::Transport(format!("candidate has no content (finish reason {})", reason))
    })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect();

    if text.trim().is_empty() {
        Err(InsightError::Transport("candidate text is empty".to_string()))
    } else {
        Ok(text)
    }
}
