//! Google Gemini client for the `generateContent` REST endpoint.
//!
//! One POST per call, no session state, no connection pinning beyond what
//! reqwest's connection pool does internally. The request body is the
//! minimal `contents/parts/text` shape; the reply text is the concatenation
//! of the first candidate's parts.
//!
//! The API key travels in the `key` query parameter, which is how the
//! generativelanguage API authenticates simple API-key callers. It is never
//! logged — `debug!` lines include the model id and prompt size only.

use crate::llm::{GenerativeModel, ModelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for one Gemini model (e.g. "gemini-1.5-flash").
pub struct GeminiModel {
    client: reqwest::Client,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiModel {
    /// Build a client for `model` with the given API key.
    ///
    /// `timeout_secs` applies per call; a call that exceeds it surfaces as
    /// [`ModelError::Timeout`] and is subject to the caller's retry policy.
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/models/{}:generateContent", self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        debug!("Gemini call: model={}, prompt {} chars", self.model, prompt.len());

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout { secs: self.timeout_secs }
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .and_then(|raw| extract_api_error(&raw))
                .unwrap_or_else(|| status.to_string());
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transport(format!("invalid response body: {e}")))?;

        let text = reply.text();
        if text.is_empty() {
            return Err(ModelError::EmptyReply(
                reply
                    .block_reason()
                    .unwrap_or_else(|| "no candidates in response".to_string()),
            ));
        }

        debug!("Gemini reply: {} chars", text.len());
        Ok(text)
    }

    fn id(&self) -> &str {
        &self.model
    }
}

/// Pull `error.message` out of a Gemini error body, if it is one.
fn extract_api_error(raw: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(raw).ok()?;
    v.get("error")?.get("message")?.as_str().map(str::to_string)
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<String> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
            .map(|r| format!("prompt blocked: {r}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_joins_candidate_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Hemo" }, { "text": "globin" }] }
            }]
        }"#;
        let reply: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.text(), "Hemoglobin");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let reply: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(reply.text().is_empty());
        assert!(reply.block_reason().is_none());
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let raw = r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#;
        let reply: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.block_reason().as_deref(), Some("prompt blocked: SAFETY"));
    }

    #[test]
    fn api_error_message_is_extracted() {
        let raw = r#"{ "error": { "code": 429, "message": "Resource has been exhausted" } }"#;
        assert_eq!(
            extract_api_error(raw).as_deref(),
            Some("Resource has been exhausted")
        );
        assert!(extract_api_error("not json").is_none());
    }

    #[test]
    fn endpoint_includes_model_id() {
        let model = GeminiModel::new("gemini-1.5-flash", "test-key", 60).unwrap();
        assert!(model
            .endpoint()
            .ends_with("/models/gemini-1.5-flash:generateContent"));
        assert_eq!(model.id(), "gemini-1.5-flash");
    }
}
