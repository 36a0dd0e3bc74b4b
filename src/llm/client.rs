//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the text-generation backends
//! used by the outline stream and the research summarizer:
//! - **Ollama**: local inference with streaming (default feature)
//! - **OpenAI**: OpenAI API and compatible endpoints with streaming

use crate::types::{AppError, Result};
use crate::utils::toml_config::{DecksmithConfig, ProviderConfig};
use async_trait::async_trait;

/// A finite, non-restartable sequence of generated text fragments.
///
/// An `Err` item is a fatal signal from the backend; consumers stop at it.
pub type LLMStream = Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Stream a completion
    async fn stream(&self, prompt: &str) -> Result<LLMStream>;

    /// Stream a completion with a system prompt
    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<LLMStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Build a provider from its TOML definition, optionally overriding the model
    pub fn from_config(config: &ProviderConfig, model: Option<&str>) -> Result<Self> {
        match config {
            ProviderConfig::Ollama {
                base_url,
                default_model,
            } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.unwrap_or(default_model).to_string(),
            }),
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                default_model,
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::LLM(format!(
                        "Environment variable '{}' for OpenAI API key is not set",
                        api_key_env
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.unwrap_or(default_model).to_string(),
                })
            }
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's cargo feature is disabled or
    /// the client cannot be constructed.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::LLM(format!(
                "{} provider support is not compiled in; enable the '{}' feature",
                other.name(),
                other.name().to_lowercase()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Creates LLM clients for a fixed provider.
///
/// # Example
///
/// ```rust,ignore
/// use decksmith::llm::{LLMClientFactory, Provider};
///
/// let factory = LLMClientFactory::new(Provider::Ollama {
///     base_url: "http://localhost:11434".to_string(),
///     model: "llama3.2".to_string(),
/// });
///
/// let client = factory.create_default().await?;
/// ```
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    /// Create a new factory with the specified default provider
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    /// Resolve `[models.<model_key>]` and its provider from configuration
    pub fn from_config(config: &DecksmithConfig, model_key: &str) -> Result<Self> {
        let model = config.get_model(model_key).ok_or_else(|| {
            AppError::LLM(format!("Model '{}' is not configured", model_key))
        })?;
        let provider_config = config.get_provider(&model.provider).ok_or_else(|| {
            AppError::LLM(format!(
                "Provider '{}' referenced by model '{}' does not exist",
                model.provider, model_key
            ))
        })?;

        let provider = Provider::from_config(provider_config, model.model.as_deref())?;
        Ok(Self::new(provider))
    }

    /// Create a client using the default provider
    pub async fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        self.default_provider.create_client().await
    }

    /// Get a reference to the default provider
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::ModelConfig;

    fn config_with_ollama() -> DecksmithConfig {
        let mut config = DecksmithConfig::default();
        config.providers.insert(
            "local".to_string(),
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
                default_model: "llama3.2".to_string(),
            },
        );
        config.models.insert(
            "outline".to_string(),
            ModelConfig {
                provider: "local".to_string(),
                model: None,
            },
        );
        config.models.insert(
            "summarizer".to_string(),
            ModelConfig {
                provider: "local".to_string(),
                model: Some("qwen2.5:0.5b".to_string()),
            },
        );
        config
    }

    #[test]
    fn test_provider_name() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "".to_string(),
        };
        assert_eq!(openai.name(), "OpenAI");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "".to_string(),
        };
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_factory_uses_provider_default_model() {
        let factory = LLMClientFactory::from_config(&config_with_ollama(), "outline").unwrap();
        assert_eq!(factory.default_provider().name(), "Ollama");
        assert_eq!(factory.default_provider().model(), "llama3.2");
    }

    #[test]
    fn test_factory_model_override() {
        let factory = LLMClientFactory::from_config(&config_with_ollama(), "summarizer").unwrap();
        assert_eq!(factory.default_provider().model(), "qwen2.5:0.5b");
    }

    #[test]
    fn test_factory_unknown_model() {
        let result = LLMClientFactory::from_config(&config_with_ollama(), "missing");
        assert!(matches!(result, Err(AppError::LLM(_))));
    }

    #[test]
    fn test_openai_provider_requires_env_key() {
        let config = ProviderConfig::OpenAI {
            api_key_env: "DECKSMITH_TEST_NEVER_SET_KEY".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4o-mini".to_string(),
        };
        assert!(Provider::from_config(&config, None).is_err());
    }
}
