//! Embedding provider abstraction layer.
//!
//! This module defines a common interface for different embedding backends
//! (OpenAI-compatible services, Ollama) and resolves one from configuration.

mod types;
pub mod ollama;
pub mod openai;

// Re-export common types
pub use types::{EmbedRequest, EmbeddingProvider, ProviderError, Result};

// Re-export provider implementations
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::{EmbeddingConfig, ProviderKind};
use std::sync::Arc;

/// Builds the configured provider for `model`.
///
/// Credentials come from the environment variable named by
/// `config.api_key_env`. Ollama needs none.
pub fn create_provider(
    config: &EmbeddingConfig,
    model: &str,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::OpenAi => {
            let api_key = std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ProviderError::MissingApiKey(config.api_key_env.clone()))?;
            Ok(Arc::new(OpenAiProvider::new(&config.base_url, api_key, model)))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(&config.base_url, model))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_api_key() {
        let config = EmbeddingConfig {
            api_key_env: "TOME_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..EmbeddingConfig::default()
        };

        let err = create_provider(&config, "m").err().unwrap();
        assert!(matches!(err, ProviderError::MissingApiKey(name) if name == "TOME_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            api_key_env: "TOME_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..EmbeddingConfig::default()
        };

        let provider = create_provider(&config, "nomic-embed-text").unwrap();
        assert_eq!(provider.model(), "nomic-embed-text");
    }
}
