//! Research source adapters.
//!
//! Each adapter wraps one external query API behind [`SourceAdapter`]. Adapters
//! report failures through [`AdapterError`]; the aggregator treats every error
//! as an empty contribution.

use crate::research::summarizer::truncate_chars;
use crate::types::ResearchItem;
use crate::utils::toml_config::SourceConfig;
use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Maximum characters kept from an archive record description
pub const ARCHIVE_DESCRIPTION_CAP: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("no API key configured for {0}")]
    MissingCredential(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Uniform contract over one external research API.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs and for API-key lookup
    fn name(&self) -> &str;

    /// Time budget for one query; the aggregator enforces it
    fn timeout(&self) -> Duration;

    /// Run the query and return at most the adapter's own result cap
    async fn search(&self, query: &str) -> AdapterResult<Vec<ResearchItem>>;
}

async fn decode_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> AdapterResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Status(status.as_u16()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AdapterError::Decode(e.to_string()))
}

fn transport(e: reqwest::Error) -> AdapterError {
    AdapterError::Transport(e.to_string())
}

/// Drop HTML markup (search-match highlighting and entities) from a fragment
pub fn strip_markup(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<String>()
}

/// Flatten a catalog field that may be a string, an array of strings, or absent
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(values) => values
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

// ============= Web Search (Tavily) =============

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

/// Ranked web-search hits with snippet content
pub struct TavilySource {
    http: reqwest::Client,
    config: SourceConfig,
    api_key: Option<String>,
}

impl TavilySource {
    pub fn new(http: reqwest::Client, config: SourceConfig, api_key: Option<String>) -> Self {
        Self {
            http,
            config,
            api_key,
        }
    }
}

#[async_trait]
impl SourceAdapter for TavilySource {
    fn name(&self) -> &str {
        "tavily"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn search(&self, query: &str) -> AdapterResult<Vec<ResearchItem>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential("tavily"))?;

        let payload = json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "advanced",
            "include_answer": false,
            "max_results": self.config.max_results,
        });

        let response = self
            .http
            .post(format!(
                "{}/search",
                self.config.base_url.trim_end_matches('/')
            ))
            .timeout(self.timeout())
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        let body: TavilyResponse = decode_json(response).await?;

        Ok(body
            .results
            .into_iter()
            .take(self.config.max_results)
            .map(|hit| ResearchItem::new(hit.title, hit.content, hit.url))
            .collect())
    }
}

// ============= Encyclopedia (Wikipedia) =============

#[derive(Debug, Deserialize)]
struct WikipediaResponse {
    #[serde(default)]
    query: Option<WikipediaQuery>,
}

#[derive(Debug, Deserialize)]
struct WikipediaQuery {
    #[serde(default)]
    search: Vec<WikipediaHit>,
}

#[derive(Debug, Deserialize)]
struct WikipediaHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Matching encyclopedia pages, snippet stripped of markup
pub struct WikipediaSource {
    http: reqwest::Client,
    config: SourceConfig,
}

impl WikipediaSource {
    pub fn new(http: reqwest::Client, config: SourceConfig) -> Self {
        Self { http, config }
    }

    fn page_url(&self, title: &str) -> String {
        format!(
            "{}/wiki/{}",
            self.config.base_url.trim_end_matches('/'),
            title.replace(' ', "_")
        )
    }
}

#[async_trait]
impl SourceAdapter for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn search(&self, query: &str) -> AdapterResult<Vec<ResearchItem>> {
        let limit = self.config.max_results.to_string();
        let response = self
            .http
            .get(format!(
                "{}/w/api.php",
                self.config.base_url.trim_end_matches('/')
            ))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .timeout(self.timeout())
            .send()
            .await
            .map_err(transport)?;

        let body: WikipediaResponse = decode_json(response).await?;
        let hits = body.query.map(|q| q.search).unwrap_or_default();

        Ok(hits
            .into_iter()
            .take(self.config.max_results)
            .map(|hit| {
                let url = self.page_url(&hit.title);
                ResearchItem::new(hit.title, strip_markup(&hit.snippet), url)
            })
            .collect())
    }
}

// ============= Catalog Index (Archive.org) =============

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    response: Option<ArchiveDocs>,
}

#[derive(Debug, Deserialize)]
struct ArchiveDocs {
    #[serde(default)]
    docs: Vec<ArchiveDoc>,
}

#[derive(Debug, Deserialize)]
struct ArchiveDoc {
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    title: Value,
    #[serde(default)]
    description: Value,
}

/// Catalog records (papers, books) with a capped description
pub struct ArchiveSource {
    http: reqwest::Client,
    config: SourceConfig,
}

impl ArchiveSource {
    pub fn new(http: reqwest::Client, config: SourceConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SourceAdapter for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn search(&self, query: &str) -> AdapterResult<Vec<ResearchItem>> {
        let rows = self.config.max_results.to_string();
        let base = self.config.base_url.trim_end_matches('/');
        let response = self
            .http
            .get(format!("{}/advancedsearch.php", base))
            .query(&[
                ("q", query),
                ("fl[]", "identifier,title,description"),
                ("rows", rows.as_str()),
                ("page", "1"),
                ("output", "json"),
            ])
            .timeout(self.timeout())
            .send()
            .await
            .map_err(transport)?;

        let body: ArchiveResponse = decode_json(response).await?;
        let docs = body.response.map(|r| r.docs).unwrap_or_default();

        Ok(docs
            .into_iter()
            .take(self.config.max_results)
            .map(|doc| {
                let title = match value_text(&doc.title) {
                    t if t.is_empty() => "Archive Document".to_string(),
                    t => t,
                };
                let description =
                    truncate_chars(&value_text(&doc.description), ARCHIVE_DESCRIPTION_CAP)
                        .to_string();
                let url = format!("{}/details/{}", base, doc.identifier);
                ResearchItem::new(title, description, url)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_removes_highlight_spans() {
        let snippet = r#"The <span class="searchmatch">solar</span> system &amp; its planets"#;
        assert_eq!(strip_markup(snippet), "The solar system & its planets");
    }

    #[test]
    fn test_value_text_shapes() {
        assert_eq!(value_text(&Value::Null), "");
        assert_eq!(value_text(&json!("plain")), "plain");
        assert_eq!(value_text(&json!(["a", "b"])), "a b");
        assert_eq!(value_text(&json!(42)), "42");
    }

    #[test]
    fn test_wikipedia_page_url() {
        let source = WikipediaSource::new(
            reqwest::Client::new(),
            SourceConfig {
                enabled: true,
                base_url: "https://en.wikipedia.org/".to_string(),
                timeout_secs: 15,
                max_results: 3,
            },
        );
        assert_eq!(
            source.page_url("Solar System"),
            "https://en.wikipedia.org/wiki/Solar_System"
        );
    }

    #[tokio::test]
    async fn test_tavily_without_key_is_missing_credential() {
        let source = TavilySource::new(
            reqwest::Client::new(),
            SourceConfig {
                enabled: true,
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_secs: 1,
                max_results: 5,
            },
            None,
        );
        let result = source.search("anything").await;
        assert!(matches!(result, Err(AdapterError::MissingCredential("tavily"))));
    }
}
