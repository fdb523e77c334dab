//! Backend construction keyed by the provider discriminator.

use std::sync::Arc;
use tracing::info;

use crate::anthropic::AnthropicBackend;
use crate::backend::AnalysisBackend;
use crate::config::{LlmConfig, ProviderKind};
use crate::error::BackendResult;
use crate::ollama::OllamaBackend;
use crate::openai::OpenAiBackend;

/// Build the backend selected by `config.provider`.
///
/// Fails for an unknown discriminator or a hosted provider without a key;
/// both are setup errors and are never retried.
pub fn build_backend(config: &LlmConfig) -> BackendResult<Arc<dyn AnalysisBackend>> {
    let kind = config.provider_kind()?;

    let backend: Arc<dyn AnalysisBackend> = match kind {
        ProviderKind::OpenAi => {
            let mut backend = OpenAiBackend::new(
                config.api_key.clone(),
                &config.model,
                config.temperature,
                config.max_tokens,
            )?;
            if let Some(url) = &config.base_url {
                backend = backend.with_base_url(url.clone());
            }
            Arc::new(backend)
        }
        ProviderKind::Anthropic => {
            let mut backend = AnthropicBackend::new(
                config.api_key.clone(),
                &config.model,
                config.temperature,
                config.max_tokens,
            )?;
            if let Some(url) = &config.base_url {
                backend = backend.with_base_url(url.clone());
            }
            Arc::new(backend)
        }
        ProviderKind::Ollama => Arc::new(OllamaBackend::new(
            &config.ollama_url,
            &config.ollama_model,
            config.temperature,
        )?),
    };

    info!(
        provider = backend.name(),
        model = backend.model(),
        "Analysis backend initialized"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    fn config(provider: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key: api_key.map(str::to_string),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_selects_backend_by_discriminator() {
        let backend = build_backend(&config("openai", Some("k"))).unwrap();
        assert_eq!(backend.name(), "openai");

        let mut cfg = config("ANTHROPIC", Some("k"));
        cfg.model = "claude-3-5-haiku-20241022".to_string();
        let backend = build_backend(&cfg).unwrap();
        assert_eq!(backend.name(), "anthropic");
        assert_eq!(backend.model(), "claude-3-5-haiku-20241022");

        let backend = build_backend(&config("ollama", None)).unwrap();
        assert_eq!(backend.name(), "ollama");
        assert_eq!(backend.model(), "llama3");
    }

    #[test]
    fn test_unsupported_provider_fails_at_setup() {
        let err = build_backend(&config("gemini", Some("k"))).err().unwrap();
        assert!(matches!(err, BackendError::UnsupportedProvider(p) if p == "gemini"));
    }

    #[test]
    fn test_missing_credential_fails_at_setup() {
        for provider in ["openai", "anthropic"] {
            let err = build_backend(&config(provider, None)).err().unwrap();
            assert!(matches!(err, BackendError::MissingCredential { .. }));
        }
    }
}
