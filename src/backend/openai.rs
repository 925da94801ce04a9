//! Client for the OpenAI Chat Completions API.
//!
//! One user message carries the document text followed by the prompt. The
//! token cap serializes as `max_completion_tokens`, the field current model
//! generations accept.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{BackendError, api_error_message};
use super::{Backend, CompletionRequest};

const API_BASE: &str = "https://api.openai.com";

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_completion_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Response body, reduced to the fields consumed here.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}

pub struct OpenAiBackend {
    api_key: String,
    client: Client,
    base_url: String,
}

impl OpenAiBackend {
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

    fn build_request(req: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: req.model.clone(),
            max_completion_tokens: req.max_tokens,
            temperature: req.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: req.flattened(),
            }],
        }
    }
}

impl Backend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError> {
        let body = Self::build_request(req);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
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

        let parsed = response.json::<ChatResponse>().await?;
        match parsed.choices.first() {
            Some(choice) => Ok(choice.message.content.clone()),
            None => Err(BackendError::MalformedResponse(
                "response carried no choices".to_string(),
            )),
        }
    }
}
