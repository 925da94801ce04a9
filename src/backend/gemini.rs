//! Client for the Google Gemini `generateContent` API.
//!
//! The model name is part of the URL rather than the body, and the wire
//! format is camelCase throughout. Document text and prompt travel as two
//! parts of a single user content entry, document first.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{BackendError, api_error_message};
use super::{Backend, CompletionRequest};

const API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Request body for `POST /v1beta/models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Response body, reduced to the candidate path consumed here.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

pub struct GeminiBackend {
    api_key: String,
    client: Client,
    base_url: String,
}

impl GeminiBackend {
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

    fn build_request(req: &CompletionRequest) -> GenerateRequest {
        let mut parts = Vec::new();
        if !req.content.trim().is_empty() {
            parts.push(Part {
                text: req.content.clone(),
            });
        }
        parts.push(Part {
            text: req.prompt.clone(),
        });
        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                max_output_tokens: req.max_tokens,
                temperature: req.temperature,
            },
        }
    }
}

impl Backend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError> {
        let body = Self::build_request(req);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, req.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
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

        let parsed = response.json::<GenerateResponse>().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone());
        match text {
            Some(text) => Ok(text),
            None => Err(BackendError::MalformedResponse(
                "response carried no candidate parts".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(content: &str, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            content: content.to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            max_tokens: 700,
            temperature: 1.0,
        }
    }

    #[test]
    fn document_part_comes_before_prompt_part() {
        let body = GeminiBackend::build_request(&request("Summary text.", "Paraphrase it."));
        assert_eq!(body.contents.len(), 1);
        assert_eq!(body.contents[0].parts[0].text, "Summary text.");
        assert_eq!(body.contents[0].parts[1].text, "Paraphrase it.");
    }

    #[test]
    fn generation_config_serializes_camel_case() {
        let body = GeminiBackend::build_request(&request("", "Hi"));
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""maxOutputTokens":700"#));
        assert!(json.contains(r#""generationConfig""#));
        assert!(!json.contains("max_output_tokens"));
    }

    #[tokio::test]
    async fn invoke_addresses_model_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Reworded."}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_base_url("g-key".into(), server.uri());
        let text = backend.invoke(&request("doc", "prompt")).await.unwrap();
        assert_eq!(text, "Reworded.");
    }

    #[tokio::test]
    async fn invoke_surfaces_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_base_url("bad".into(), server.uri());
        let err = backend.invoke(&request("doc", "prompt")).await.unwrap_err();
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invoke_rejects_missing_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_base_url("g-key".into(), server.uri());
        let err = backend.invoke(&request("doc", "prompt")).await.unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }
}
