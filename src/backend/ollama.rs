//! Client for a local Ollama daemon.
//!
//! Talks to `/api/chat` with streaming disabled, so the whole reply arrives
//! as one JSON object. No authentication; the host is configurable for
//! non-default daemon addresses.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{BackendError, api_error_message};
use super::{Backend, CompletionRequest};

pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Model options. `num_predict` is Ollama's output-token cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// Response body, reduced to the message consumed here.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_HOST.to_string())
    }

    /// Create a client pointing at a custom daemon address.
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }

    fn build_request(req: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: req.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: req.flattened(),
            }],
            stream: false,
            options: ChatOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            },
        }
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError> {
        let body = Self::build_request(req);
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: api_error_message(status.as_u16(), &body),
            });
        }

        let parsed = response.json::<ChatResponse>().await?;
        Ok(parsed.message.content)
    }
}
