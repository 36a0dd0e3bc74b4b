use crate::research::sources::{
    AdapterError, ArchiveSource, SourceAdapter, TavilySource, WikipediaSource,
};
use crate::types::{ResearchBundle, ResearchItem, SourceRef};
use crate::utils::toml_config::ResearchConfig;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Fan-out/fan-in over every registered [`SourceAdapter`].
///
/// Adapters run concurrently, each under its own timeout. The merged result is
/// ordered by registration, not by completion, and deduplicated by URL.
#[derive(Default, Clone)]
pub struct ResearchAggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl ResearchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in sources enabled in `config`, in fixed order:
    /// web search, encyclopedia, catalog index.
    pub fn from_config(config: &ResearchConfig, http: &reqwest::Client) -> Self {
        let mut aggregator = Self::new();

        if config.tavily.enabled {
            aggregator.register(Arc::new(TavilySource::new(
                http.clone(),
                config.tavily.clone(),
                config.api_key("tavily"),
            )));
        }
        if config.wikipedia.enabled {
            aggregator.register(Arc::new(WikipediaSource::new(
                http.clone(),
                config.wikipedia.clone(),
            )));
        }
        if config.archive.enabled {
            aggregator.register(Arc::new(ArchiveSource::new(
                http.clone(),
                config.archive.clone(),
            )));
        }

        aggregator
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn source_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    /// Query every source and merge whatever succeeds.
    ///
    /// Never fails: a source that errors or blows its timeout contributes
    /// nothing. If nothing survives, the bundle is empty.
    pub async fn gather(&self, query: &str) -> ResearchBundle {
        let mut set = JoinSet::new();

        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let query = query.to_string();

            set.spawn(async move {
                let budget = adapter.timeout();
                let result = match tokio::time::timeout(budget, adapter.search(&query)).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::Timeout(budget)),
                };
                (index, result)
            });
        }

        let mut contributions: Vec<Vec<ResearchItem>> = vec![Vec::new(); self.adapters.len()];

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(items))) => {
                    debug!(
                        source = self.adapters[index].name(),
                        count = items.len(),
                        "Research source returned results"
                    );
                    contributions[index] = items;
                }
                Ok((index, Err(e))) => {
                    warn!(
                        source = self.adapters[index].name(),
                        error = %e,
                        "Research source failed; contributing nothing"
                    );
                }
                Err(e) => {
                    warn!("Research source task did not complete: {}", e);
                }
            }
        }

        let items = dedup_by_url(contributions.into_iter().flatten());
        info!(
            sources = self.adapters.len(),
            items = items.len(),
            "Research gathering finished"
        );

        build_bundle(&items)
    }
}

/// Keep the first occurrence of each non-empty URL. Items without a URL are
/// never considered duplicates.
pub fn dedup_by_url(items: impl IntoIterator<Item = ResearchItem>) -> Vec<ResearchItem> {
    let mut seen = HashSet::new();

    items
        .into_iter()
        .filter(|item| item.url.is_empty() || seen.insert(item.url.clone()))
        .collect()
}

/// Format items as `Title:` / `Content:` / `Source:` blocks separated by blank lines
pub fn build_bundle(items: &[ResearchItem]) -> ResearchBundle {
    if items.is_empty() {
        return ResearchBundle::default();
    }

    let summary = items
        .iter()
        .map(|item| {
            format!(
                "Title: {}\nContent: {}\nSource: {}\n",
                item.title, item.content, item.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let sources = items
        .iter()
        .map(|item| SourceRef {
            title: if item.title.is_empty() {
                "Unknown Source".to_string()
            } else {
                item.title.clone()
            },
            url: item.url.clone(),
        })
        .collect();

    ResearchBundle { summary, sources }
}
