//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, outline generators and researchers
//! that can be used across different test files without duplication.

use async_trait::async_trait;
use decksmith::db::{PresentationStore, TursoClient};
use decksmith::llm::{LLMClient, LLMStream};
use decksmith::outline::OutlineGenerator;
use decksmith::research::Researcher;
use decksmith::types::{
    AppError, CreatePresentationRequest, OutlineGenerationRequest, Presentation,
    PresentationOutline, ResearchBundle, Result, SourceRef,
};
use futures::stream;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock LLM client returning a fixed response, or always failing.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn stream(&self, _prompt: &str) -> Result<LLMStream> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        let words: Vec<Result<String>> = self
            .response
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(Box::new(stream::iter(words)))
    }

    async fn stream_with_system(&self, _system: &str, prompt: &str) -> Result<LLMStream> {
        self.stream(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// One recorded call to [`MockGenerator`]
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorCall {
    pub n_slides: u32,
    pub context: String,
}

/// Outline generator that replays scripted chunks.
#[derive(Clone, Default)]
pub struct MockGenerator {
    chunks: Vec<String>,
    fail_after: Option<usize>,
    fail_to_start: bool,
    calls: Arc<Mutex<Vec<GeneratorCall>>>,
}

impl MockGenerator {
    pub fn emitting(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// A well-formed outline with `n` slides, split into small chunks
    pub fn with_slides(n: usize) -> Self {
        let slides: Vec<String> = (1..=n)
            .map(|i| format!(r##"{{"content": "# Slide {}\n- point {}"}}"##, i, i))
            .collect();
        let text = format!(r#"{{"slides": [{}]}}"#, slides.join(", "));

        let chunks: Vec<String> = text
            .chars()
            .collect::<Vec<_>>()
            .chunks(16)
            .map(|c| c.iter().collect())
            .collect();

        Self {
            chunks,
            ..Self::default()
        }
    }

    /// Emit the first `emitted` chunks, then a fatal error
    pub fn failing_after(chunks: &[&str], emitted: usize) -> Self {
        Self {
            fail_after: Some(emitted),
            ..Self::emitting(chunks)
        }
    }

    pub fn failing_to_start() -> Self {
        Self {
            fail_to_start: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutlineGenerator for MockGenerator {
    async fn generate(
        &self,
        _request: &OutlineGenerationRequest,
        n_slides: u32,
        additional_context: &str,
    ) -> Result<LLMStream> {
        self.calls.lock().unwrap().push(GeneratorCall {
            n_slides,
            context: additional_context.to_string(),
        });

        if self.fail_to_start {
            return Err(AppError::LLM("backend unavailable".to_string()));
        }

        let mut items: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(emitted) = self.fail_after {
            items.truncate(emitted);
            items.push(Err(AppError::LLM("generation interrupted".to_string())));
        }

        Ok(Box::new(stream::iter(items)))
    }
}

#[derive(Clone)]
pub enum ResearchBehavior {
    Found(ResearchBundle),
    Empty,
    Fail,
    Panic,
    /// Never returns
    Hang,
}

/// Researcher with a scripted outcome that records its queries.
#[derive(Clone)]
pub struct MockResearcher {
    behavior: ResearchBehavior,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockResearcher {
    pub fn new(behavior: ResearchBehavior) -> Self {
        Self {
            behavior,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn found(summary: &str) -> Self {
        Self::new(ResearchBehavior::Found(ResearchBundle {
            summary: summary.to_string(),
            sources: vec![SourceRef {
                title: "Mock Source".to_string(),
                url: "https://example.com/mock".to_string(),
            }],
        }))
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Researcher for MockResearcher {
    async fn research(&self, query: &str) -> Result<ResearchBundle> {
        self.queries.lock().unwrap().push(query.to_string());

        match &self.behavior {
            ResearchBehavior::Found(bundle) => Ok(bundle.clone()),
            ResearchBehavior::Empty => Ok(ResearchBundle::default()),
            ResearchBehavior::Fail => Err(AppError::Research("all sources down".to_string())),
            ResearchBehavior::Panic => panic!("research pipeline exploded"),
            ResearchBehavior::Hang => futures::future::pending().await,
        }
    }
}

/// In-memory store whose outline writes always fail.
pub struct ReadOnlyStore {
    inner: TursoClient,
}

impl ReadOnlyStore {
    pub async fn new() -> Self {
        Self {
            inner: TursoClient::new_memory().await.unwrap(),
        }
    }
}

#[async_trait]
impl PresentationStore for ReadOnlyStore {
    async fn create_presentation(&self, request: &CreatePresentationRequest) -> Result<Presentation> {
        self.inner.create_presentation(request).await
    }

    async fn get_presentation(&self, id: Uuid) -> Result<Option<Presentation>> {
        self.inner.get_presentation(id).await
    }

    async fn save_outline(
        &self,
        _id: Uuid,
        _outline: &PresentationOutline,
        _title: &str,
    ) -> Result<Presentation> {
        Err(AppError::Database("database is read-only".to_string()))
    }
}
