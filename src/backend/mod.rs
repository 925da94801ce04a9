//! Clients for the hosted completion providers.
//!
//! Each submodule implements one provider over plain HTTPS. They all plug in
//! behind the [`Backend`] trait, which is the only surface the dispatcher
//! sees; tests substitute an in-memory stub for the trait.

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use error::BackendError;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use std::fmt;

/// Parameters for one completion call.
///
/// `content` carries the extracted document text and may be empty when the
/// prompt stands alone. When present, providers place it before the prompt,
/// so the model reads the document first and the instruction last.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub content: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Collapses the request into one user-message body, document text first,
    /// for providers whose payload takes a single string.
    pub fn flattened(&self) -> String {
        if self.content.trim().is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.content, self.prompt)
        }
    }
}

/// A completion provider: sends one request, returns the response text.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Short provider label used in logs and derived folder names.
    fn name(&self) -> &'static str;

    async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError>;
}

/// Supported providers, as selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
    Ollama,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
        }
    }

    /// Model used when the command line does not pass `--model`.
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-5-20250929",
            Provider::OpenAi => "gpt-5.2-2025-12-11",
            Provider::Gemini => "gemini-2.5-flash-lite",
            Provider::Ollama => "llama3",
        }
    }

    /// Environment variable holding the provider's API key. `None` for the
    /// local Ollama daemon, which is unauthenticated.
    pub fn api_key_var(self) -> Option<&'static str> {
        match self {
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider client selected at runtime. The trait's async methods keep it
/// out of `dyn` territory, so runtime selection goes through this enum.
pub enum AnyBackend {
    Anthropic(AnthropicBackend),
    OpenAi(OpenAiBackend),
    Gemini(GeminiBackend),
    Ollama(OllamaBackend),
}

impl Backend for AnyBackend {
    fn name(&self) -> &'static str {
        match self {
            AnyBackend::Anthropic(b) => b.name(),
            AnyBackend::OpenAi(b) => b.name(),
            AnyBackend::Gemini(b) => b.name(),
            AnyBackend::Ollama(b) => b.name(),
        }
    }

    async fn invoke(&self, req: &CompletionRequest) -> Result<String, BackendError> {
        match self {
            AnyBackend::Anthropic(b) => b.invoke(req).await,
            AnyBackend::OpenAi(b) => b.invoke(req).await,
            AnyBackend::Gemini(b) => b.invoke(req).await,
            AnyBackend::Ollama(b) => b.invoke(req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_default_models() {
        assert_eq!(
            Provider::Anthropic.default_model(),
            "claude-sonnet-4-5-20250929"
        );
        assert_eq!(Provider::OpenAi.default_model(), "gpt-5.2-2025-12-11");
        assert_eq!(Provider::Gemini.default_model(), "gemini-2.5-flash-lite");
        assert_eq!(Provider::Ollama.default_model(), "llama3");
    }

    #[test]
    fn only_ollama_needs_no_key() {
        assert_eq!(Provider::Anthropic.api_key_var(), Some("ANTHROPIC_API_KEY"));
        assert_eq!(Provider::OpenAi.api_key_var(), Some("OPENAI_API_KEY"));
        assert_eq!(Provider::Gemini.api_key_var(), Some("GEMINI_API_KEY"));
        assert_eq!(Provider::Ollama.api_key_var(), None);
    }

    #[test]
    fn flattened_puts_document_before_prompt() {
        let req = CompletionRequest {
            prompt: "Summarize this.".into(),
            content: "Document body.".into(),
            model: "m".into(),
            max_tokens: 100,
            temperature: 1.0,
        };
        assert_eq!(req.flattened(), "Document body.\n\nSummarize this.");
    }

    #[test]
    fn flattened_skips_empty_document() {
        let req = CompletionRequest {
            prompt: "Rewrite the text above.".into(),
            content: "  ".into(),
            model: "m".into(),
            max_tokens: 100,
            temperature: 1.0,
        };
        assert_eq!(req.flattened(), "Rewrite the text above.");
    }

    #[test]
    fn provider_display_matches_name() {
        assert_eq!(Provider::Gemini.to_string(), "gemini");
        assert_eq!(Provider::OpenAi.to_string(), "openai");
    }
}
