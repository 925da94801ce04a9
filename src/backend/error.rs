//! Error type shared by all provider clients.

use thiserror::Error;

/// Errors from a provider call. Always handled as per-item failures by the
/// dispatcher; the variants exist so callers can log something more useful
/// than a bare status code.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The server returned HTTP 429. `retry_after_ms` comes from the
    /// `retry-after` header when present.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-success HTTP status, with the provider's message when
    /// the error body was parseable.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Underlying transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response whose body did not carry the expected content field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Pulls a human-readable message out of a provider error body. Providers
/// wrap it as `{ "error": { "message": ... } }`, `{ "error": "..." }` or
/// `{ "message": ... }`; anything else falls back to a bounded snippet of
/// the raw body.
pub(crate) fn api_error_message(status: u16, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = v.get("error").and_then(|e| e.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {status} with empty body");
    }
    match trimmed.char_indices().nth(400) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
