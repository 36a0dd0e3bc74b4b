//! LLM client implementations.
//!
//! The outline stream consumes [`LLMClient::stream_with_system`] as a lazy
//! fragment stream; the research summarizer uses the one-shot
//! [`LLMClient::generate_with_system`].

/// Core LLM client trait, provider selection and client factory.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, LLMStream, Provider};
