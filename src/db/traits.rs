//! Presentation persistence traits
//!
//! The outline stream depends only on [`PresentationStore`], so tests can run
//! it against an in-memory database and production against a local file or a
//! remote Turso instance.
//!
//! # Example
//!
//! ```rust,ignore
//! use decksmith::db::{PresentationStore, TursoClient};
//!
//! let store = TursoClient::new_memory().await?;
//! let presentation = store.create_presentation(&request).await?;
//! let loaded = store.get_presentation(presentation.id).await?;
//! ```

use crate::types::{CreatePresentationRequest, Presentation, PresentationOutline, Result};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PresentationStore: Send + Sync {
    /// Insert a new presentation with no outline yet
    async fn create_presentation(&self, request: &CreatePresentationRequest) -> Result<Presentation>;

    async fn get_presentation(&self, id: Uuid) -> Result<Option<Presentation>>;

    /// Write `outlines` and `title` in a single update and return the updated
    /// record. Fails with `NotFound` if the presentation no longer exists.
    async fn save_outline(
        &self,
        id: Uuid,
        outline: &PresentationOutline,
        title: &str,
    ) -> Result<Presentation>;
}
