//! Client for the Anthropic Messages API.
//!
//! Wire structs follow the `v1/messages` endpoint format. The user turn
//! carries two text blocks when document content is present, document first,
//! so the instruction arrives after the material it refers to.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{BackendError, api_error_message};
use super::{Backend, CompletionRequest};

const API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<Message>,
}

/// A single turn in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" or "assistant".
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// One content block. The `block_type` field serializes as `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: String,
}

impl ContentBlock {
    fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Response body from `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    /// "end_turn", "max_tokens", etc. `None` while in progress.
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// Token accounting for one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

pub struct AnthropicBackend {
    api_key: String,
    client: Client,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, API_BASE.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            base_url,
        }
    }

    fn build_request(req: &CompletionRequest) -> MessagesRequest {
        let mut blocks = Vec::new();
        if !req.content.trim().is_empty() {
            blocks.push(ContentBlock::text(&req.content));
        }
        blocks.push(ContentBlock::text(&req.prompt));
        MessagesRequest {
            model: req.model.clone(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: blocks,
            }],
        }
    }
}

impl Backend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError> {
        let body = Self::build_request(req);
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(BackendError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: api_error_message(status.as_u16(), &body),
            });
        }

        let parsed = response.json::<MessagesResponse>().await?;
        match parsed.content.first() {
            Some(block) => Ok(block.text.clone()),
            None => Err(BackendError::MalformedResponse(
                "response carried no content blocks".to_string(),
            )),
        }
    }
}
