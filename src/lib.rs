//! # Decksmith - streaming presentation outlines
//!
//! Generates presentation outlines with an LLM and streams them to the client
//! over Server-Sent Events, optionally enriched with research gathered in
//! parallel from a web-search API, an encyclopedia and a catalog index.
//!
//! ## Overview
//!
//! Decksmith can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `decksmith-server` binary
//! 2. **As a library** - Import the research or outline components
//!
//! ### Research Example
//!
//! ```rust,ignore
//! use decksmith::research::{ResearchAggregator, Researcher};
//!
//! let aggregator = ResearchAggregator::from_config(&config.research, &http);
//! let bundle = aggregator.gather("History of the printing press").await;
//! println!("{} sources", bundle.sources.len());
//! ```
//!
//! ### Outline Stream Example
//!
//! ```rust,ignore
//! use decksmith::documents::DocumentsLoader;
//! use decksmith::outline::OutlineStreamer;
//! use futures::StreamExt;
//!
//! let documents = DocumentsLoader::new("./data/uploads");
//! let streamer = OutlineStreamer::new(store, researcher, generator, documents);
//! let mut events = streamer.open(presentation_id).await?;
//! while let Some(event) = events.next().await {
//!     println!("{}", event.payload());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//! | `turso` | Remote Turso database |
//!
//! ## Modules
//!
//! - [`api`] - REST and SSE handlers and routes
//! - [`db`] - Presentation persistence (SQLite, Turso)
//! - [`documents`] - Attachment loading
//! - [`llm`] - LLM client implementations
//! - [`outline`] - Outline stream orchestration
//! - [`research`] - Multi-source research aggregation
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface for the server binary.
pub mod cli;
/// Presentation database clients.
pub mod db;
/// Attachment loading and text extraction.
pub mod documents;
/// LLM provider clients and abstractions.
pub mod llm;
/// Streaming outline generation.
pub mod outline;
/// Multi-source research aggregation.
pub mod research;
/// Core types (records, events, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{PresentationStore, TursoClient};
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use outline::{LlmOutlineGenerator, OutlineGenerator, OutlineStreamer};
pub use research::{ResearchAggregator, ResearchService, Researcher};
pub use types::{AppError, Result};
pub use utils::toml_config::{DecksmithConfig, DecksmithConfigManager};

use crate::documents::DocumentsLoader;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration with hot-reload support
    pub config_manager: Arc<DecksmithConfigManager>,
    /// Presentation store
    pub store: Arc<dyn PresentationStore>,
    /// Research pipeline used when a presentation asks for web search
    pub researcher: Arc<dyn Researcher>,
    /// Outline generator
    pub generator: Arc<dyn OutlineGenerator>,
}

impl AppState {
    /// Orchestrator wired to this state's store, researcher and generator.
    /// The upload root is read from the live config.
    pub fn outline_streamer(&self) -> OutlineStreamer {
        let upload_root = self.config_manager.config().documents.upload_root.clone();
        OutlineStreamer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.researcher),
            Arc::clone(&self.generator),
            DocumentsLoader::new(upload_root),
        )
    }
}
