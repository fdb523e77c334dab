//! Backend selection and tuning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BackendError;

/// Environment variable selecting the provider.
pub const ENV_PROVIDER: &str = "LLM_PROVIDER";
/// Environment variable overriding the hosted model.
pub const ENV_MODEL: &str = "LLM_MODEL";
/// OpenAI API key variable.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Anthropic API key variable.
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
/// Ollama base URL variable.
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";
/// Ollama model variable.
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Supported backend providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Local models served by Ollama
    Ollama,
}

impl ProviderKind {
    /// Get the provider's name as a string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    #[must_use]
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some(ENV_OPENAI_API_KEY),
            Self::Anthropic => Some(ENV_ANTHROPIC_API_KEY),
            Self::Ollama => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(BackendError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Configuration for the analysis backend.
///
/// `provider` is kept as a raw string so an unknown value surfaces as a
/// construction error from [`crate::build_backend`] rather than a
/// deserialization failure of the whole config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider discriminator ("openai", "anthropic", "ollama")
    pub provider: String,
    /// Model for hosted providers
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// API key for hosted providers (never serialized)
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Optional base URL override for hosted providers
    pub base_url: Option<String>,
    /// Ollama server URL
    pub ollama_url: String,
    /// Ollama model
    pub ollama_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi.as_str().to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_key: None,
            base_url: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl LlmConfig {
    /// Build a configuration from environment variables over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(provider) = std::env::var(ENV_PROVIDER) {
            config.provider = provider;
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            config.model = model;
        }
        if let Ok(url) = std::env::var(ENV_OLLAMA_URL) {
            config.ollama_url = url;
        }
        if let Ok(model) = std::env::var(ENV_OLLAMA_MODEL) {
            config.ollama_model = model;
        }
        config.load_api_key();
        config
    }

    /// Fill `api_key` from the provider's environment variable when unset.
    pub fn load_api_key(&mut self) {
        if self.api_key.is_some() {
            return;
        }
        let env_var = self
            .provider_kind()
            .ok()
            .and_then(ProviderKind::api_key_env_var);
        if let Some(env_var) = env_var {
            self.api_key = std::env::var(env_var).ok().filter(|k| !k.is_empty());
        }
    }

    /// Parse the provider discriminator.
    pub fn provider_kind(&self) -> Result<ProviderKind, BackendError> {
        self.provider.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(
            "Anthropic".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(" OLLAMA ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!(matches!(
            "bard".parse::<ProviderKind>(),
            Err(BackendError::UnsupportedProvider(p)) if p == "bard"
        ));
    }

    #[test]
    fn test_defaults_match_hosted_openai() {
        let config = LlmConfig::default();
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::OpenAi);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    #[serial]
    fn test_from_env_reads_provider_specific_key() {
        std::env::set_var(ENV_PROVIDER, "anthropic");
        std::env::set_var(ENV_ANTHROPIC_API_KEY, "sk-ant-test");
        std::env::set_var(ENV_OPENAI_API_KEY, "sk-openai-test");

        let config = LlmConfig::from_env();
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::Anthropic);
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-test"));

        std::env::remove_var(ENV_PROVIDER);
        std::env::remove_var(ENV_ANTHROPIC_API_KEY);
        std::env::remove_var(ENV_OPENAI_API_KEY);
    }

    #[test]
    #[serial]
    fn test_ollama_needs_no_key() {
        std::env::set_var(ENV_PROVIDER, "ollama");
        std::env::set_var(ENV_OPENAI_API_KEY, "sk-openai-test");

        let config = LlmConfig::from_env();
        assert!(config.api_key.is_none());

        std::env::remove_var(ENV_PROVIDER);
        std::env::remove_var(ENV_OPENAI_API_KEY);
    }
}
