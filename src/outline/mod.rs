//! Streaming outline generation
//!
//! # Architecture
//!
//! - [`stream::OutlineStreamer`] - the orchestrator: attachments, research,
//!   generation, parsing, persistence
//! - [`generator`] - prompt construction and the lazy text-fragment stream
//! - [`lenient`] - forgiving JSON for model output
//! - [`events`] - terminal-event guard and SSE framing

/// SSE framing and the single-terminal-event guarantee.
pub mod events;
/// Outline generators.
pub mod generator;
/// Forgiving JSON parsing.
pub mod lenient;
/// The outline stream state machine.
pub mod stream;

pub use generator::{LlmOutlineGenerator, OutlineGenerator};
pub use stream::{
    derive_title, merge_context, parse_outline, slides_to_generate, EventStream, OutlineStreamer,
};
