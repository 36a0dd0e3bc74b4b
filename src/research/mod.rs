//! Multi-Source Research Aggregation
//!
//! This module enriches outline generation with external research gathered
//! from several independent sources in parallel.
//!
//! # Architecture
//!
//! - [`sources`] - one [`sources::SourceAdapter`] per external API
//!   (web search, encyclopedia, catalog index)
//! - [`aggregator::ResearchAggregator`] - fan-out/fan-in, URL dedup, bundle formatting
//! - [`summarizer::Summarizer`] - optional condense stage for oversized corpora
//! - [`ResearchService`] - the two stages wired from live configuration
//!
//! # Usage
//!
//! ```ignore
//! use decksmith::research::{Researcher, ResearchService};
//!
//! let service = ResearchService::new(config_manager);
//! let bundle = service.research("History of the printing press").await?;
//!
//! println!("{}", bundle.summary);
//! for source in bundle.sources {
//!     println!("- {} ({})", source.title, source.url);
//! }
//! ```

/// Fan-out/fan-in aggregation across research sources.
pub mod aggregator;
/// External research API adapters.
pub mod sources;
/// Optional LLM-backed condensing of merged research.
pub mod summarizer;

pub use aggregator::ResearchAggregator;
pub use sources::{AdapterError, SourceAdapter};
pub use summarizer::Summarizer;

use crate::llm::LLMClientFactory;
use crate::types::{AppError, ResearchBundle, Result};
use crate::utils::toml_config::{DecksmithConfig, DecksmithConfigManager, SUMMARIZER_MODEL};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces a research bundle for a free-text query.
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, query: &str) -> Result<ResearchBundle>;
}

/// Shared HTTP client for research sources
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("decksmith/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Aggregator plus optional summarizer, rebuilt from the live configuration
/// on every run.
pub struct ResearchService {
    config: Arc<DecksmithConfigManager>,
    http: reqwest::Client,
}

impl ResearchService {
    pub fn new(config: Arc<DecksmithConfigManager>, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn summarizer(&self, config: &DecksmithConfig) -> Option<Summarizer> {
        if !config.research.summarizer.enabled {
            return None;
        }

        let factory = match LLMClientFactory::from_config(config, SUMMARIZER_MODEL) {
            Ok(factory) => factory,
            Err(e) => {
                debug!("Research summarizer unavailable: {}", e);
                return None;
            }
        };

        match factory.create_default().await {
            Ok(llm) => Some(Summarizer::new(llm, config.research.summarizer.clone())),
            Err(e) => {
                warn!("Failed to create summarizer client: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Researcher for ResearchService {
    async fn research(&self, query: &str) -> Result<ResearchBundle> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Research(
                "cannot research an empty query".to_string(),
            ));
        }

        let config = self.config.config();
        if !config.research.enabled {
            info!("Research disabled in configuration; skipping");
            return Ok(ResearchBundle::default());
        }

        let aggregator = ResearchAggregator::from_config(&config.research, &self.http);
        let mut bundle = aggregator.gather(query).await;

        if bundle.is_empty() {
            return Ok(bundle);
        }

        if let Some(summarizer) = self.summarizer(&config).await {
            if summarizer.should_condense(&bundle.summary) {
                bundle.summary = summarizer.condense(&bundle.summary).await;
            }
        }

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_query_is_an_error() {
        let manager = Arc::new(DecksmithConfigManager::from_config(DecksmithConfig::default()));
        let service = ResearchService::new(manager, reqwest::Client::new());

        let result = service.research("   ").await;
        assert!(matches!(result, Err(AppError::Research(_))));
    }

    #[tokio::test]
    async fn test_disabled_research_returns_empty_bundle() {
        let mut config = DecksmithConfig::default();
        config.research.enabled = false;
        let manager = Arc::new(DecksmithConfigManager::from_config(config));
        let service = ResearchService::new(manager, reqwest::Client::new());

        let bundle = service.research("rust").await.unwrap();
        assert!(bundle.is_empty());
    }
}
