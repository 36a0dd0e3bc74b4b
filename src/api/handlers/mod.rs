//! API request handlers.

/// Health check handler.
pub mod health;
/// Outline streaming handler.
pub mod outlines;
/// Presentation create/get handlers.
pub mod presentations;
