//! Configuration loaded from `sumbench.toml` plus the environment.
//!
//! All fields are optional in the file. A `.env` file in the working
//! directory is loaded first (missing is fine), then the provider
//! environment variables take precedence over the file. A hosted provider
//! selected without its key is a batch-fatal error at startup.

use std::path::Path;

use serde::Deserialize;

use crate::backend::{
    AnthropicBackend, AnyBackend, GeminiBackend, OllamaBackend, OpenAiBackend, Provider,
};
use crate::error::SumbenchError;

/// Top-level configuration for one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct SumbenchConfig {
    #[serde(default)]
    pub anthropic_api_key: String,

    #[serde(default)]
    pub openai_api_key: String,

    #[serde(default)]
    pub gemini_api_key: String,

    /// Base URL of the local Ollama daemon.
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

// A set, non-empty variable wins over the file; an unset or empty one
// leaves the configured value alone.
fn override_from(slot: &mut String, value: Result<String, std::env::VarError>) {
    if let Ok(value) = value {
        if !value.is_empty() {
            *slot = value;
        }
    }
}

impl Default for SumbenchConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            gemini_api_key: String::new(),
            ollama_host: default_ollama_host(),
        }
    }
}

impl SumbenchConfig {
    /// Load `sumbench.toml` from the working directory, then apply the
    /// environment: `.env` first (ignored when absent), then real variables
    /// with precedence over both.
    pub fn load() -> Result<Self, SumbenchError> {
        dotenvy::dotenv().ok();

        let path = Path::new("sumbench.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<SumbenchConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        for (var, slot) in [
            ("ANTHROPIC_API_KEY", &mut self.anthropic_api_key),
            ("OPENAI_API_KEY", &mut self.openai_api_key),
            ("GEMINI_API_KEY", &mut self.gemini_api_key),
            ("OLLAMA_HOST", &mut self.ollama_host),
        ] {
            override_from(slot, std::env::var(var));
        }
    }

    /// The configured key for a hosted provider, or `MissingApiKey` naming
    /// the variable to set. Ollama needs no key.
    fn api_key(&self, provider: Provider) -> Result<String, SumbenchError> {
        let key = match provider {
            Provider::Anthropic => &self.anthropic_api_key,
            Provider::OpenAi => &self.openai_api_key,
            Provider::Gemini => &self.gemini_api_key,
            Provider::Ollama => return Ok(String::new()),
        };
        if key.is_empty() {
            let var = provider
                .api_key_var()
                .unwrap_or("the provider's API key variable");
            return Err(SumbenchError::MissingApiKey(var));
        }
        Ok(key.clone())
    }

    /// Construct the client for the selected provider.
    pub fn backend(&self, provider: Provider) -> Result<AnyBackend, SumbenchError> {
        Ok(match provider {
            Provider::Anthropic => {
                AnyBackend::Anthropic(AnthropicBackend::new(self.api_key(provider)?))
            }
            Provider::OpenAi => AnyBackend::OpenAi(OpenAiBackend::new(self.api_key(provider)?)),
            Provider::Gemini => AnyBackend::Gemini(GeminiBackend::new(self.api_key(provider)?)),
            Provider::Ollama => {
                AnyBackend::Ollama(OllamaBackend::with_base_url(self.ollama_host.clone()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = SumbenchConfig::default();
        assert!(config.anthropic_api_key.is_empty());
        assert!(config.openai_api_key.is_empty());
        assert!(config.gemini_api_key.is_empty());
        assert_eq!(config.ollama_host, "http://localhost:11434");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            gemini_api_key = "g-test-123"
        "#;
        let config: SumbenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gemini_api_key, "g-test-123");
        assert!(config.anthropic_api_key.is_empty());
        assert_eq!(config.ollama_host, "http://localhost:11434");
    }

    #[test]
    fn env_override_wins_only_when_set_and_non_empty() {
        let mut slot = String::from("from-file");
        override_from(&mut slot, Ok(String::from("from-env")));
        assert_eq!(slot, "from-env");

        override_from(&mut slot, Ok(String::new()));
        assert_eq!(slot, "from-env");

        override_from(&mut slot, Err(std::env::VarError::NotPresent));
        assert_eq!(slot, "from-env");
    }

    #[test]
    fn missing_key_names_the_variable() {
        let config = SumbenchConfig::default();
        let err = config.api_key(Provider::Gemini).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn ollama_backend_needs_no_key() {
        let config = SumbenchConfig::default();
        assert!(config.backend(Provider::Ollama).is_ok());
    }

    #[test]
    fn configured_key_builds_hosted_backend() {
        let config = SumbenchConfig {
            anthropic_api_key: "sk-test".into(),
            ..SumbenchConfig::default()
        };
        assert!(config.backend(Provider::Anthropic).is_ok());
        assert!(config.backend(Provider::OpenAi).is_err());
    }
}
