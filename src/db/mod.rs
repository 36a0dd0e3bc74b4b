//! Presentation persistence.
//!
//! - **Turso/SQLite**: presentation records, including the generated outline
//!   and title. In-memory, local file, or remote Turso (`turso` feature).

pub mod traits;
pub mod turso;

pub use traits::PresentationStore;
pub use turso::TursoClient;
