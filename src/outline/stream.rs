use crate::db::PresentationStore;
use crate::documents::DocumentsLoader;
use crate::outline::generator::OutlineGenerator;
use crate::outline::lenient::{self, LenientJsonError};
use crate::research::summarizer::truncate_chars;
use crate::research::Researcher;
use crate::types::{
    AppError, OutlineGenerationRequest, Presentation, PresentationOutline, Result, StreamEvent,
};
use async_stream::stream;
use futures::{FutureExt, Stream, StreamExt};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const STATUS_GENERATING: &str = "Generating presentation outlines...";
pub const STATUS_LOADING_DOCUMENTS: &str = "Loading uploaded documents...";
pub const STATUS_RESEARCHING: &str = "Running research (web + encyclopedia + archive)...";
pub const STATUS_RESEARCH_FOUND: &str = "Research completed. Enhancing outline generation...";
pub const STATUS_RESEARCH_EMPTY: &str = "No external research found. Continuing...";
pub const STATUS_RESEARCH_FAILED: &str = "Research failed. Continuing without external context.";

pub const RESEARCH_CONTEXT_HEADER: &str = "External Research Context:\n";
pub const UNTITLED_PRESENTATION: &str = "Untitled Presentation";
const TITLE_MAX_CHARS: usize = 100;
const TOC_ENTRIES_PER_PAGE: u32 = 10;

/// Events for one outline stream, in production order
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum OutlineParseError {
    #[error(transparent)]
    Json(#[from] LenientJsonError),

    #[error("unexpected outline shape: {0}")]
    Shape(String),
}

/// Number of content slides to request once table-of-contents pages are
/// carved out of `n_slides`. Each TOC page lists at most ten slides.
pub fn slides_to_generate(n_slides: u32, include_table_of_contents: bool) -> u32 {
    if !include_table_of_contents {
        return n_slides;
    }

    let toc_pages = n_slides.saturating_sub(1).div_ceil(TOC_ENTRIES_PER_PAGE);
    let reduction = n_slides
        .saturating_sub(toc_pages)
        .div_ceil(TOC_ENTRIES_PER_PAGE);
    n_slides.saturating_sub(reduction)
}

/// Attachment text, preceded by a labeled research section when there is research
pub fn merge_context(attachments: &str, research: &str) -> String {
    if research.trim().is_empty() {
        return attachments.to_string();
    }

    let mut merged = String::with_capacity(attachments.len() + research.len() + 32);
    if !attachments.is_empty() {
        merged.push_str(attachments);
        merged.push_str("\n\n");
    }
    merged.push_str(RESEARCH_CONTEXT_HEADER);
    merged.push_str(research);
    merged
}

/// Parse accumulated generator output and keep at most `max_slides` slides.
/// Short outlines are never padded.
pub fn parse_outline(
    text: &str,
    max_slides: u32,
) -> std::result::Result<PresentationOutline, OutlineParseError> {
    let value = match lenient::parse(text)? {
        Value::Array(slides) => serde_json::json!({ "slides": slides }),
        value @ Value::Object(_) => value,
        other => {
            return Err(OutlineParseError::Shape(format!(
                "expected an object, found {}",
                other
            )))
        }
    };

    if value.get("slides").is_none() {
        return Err(OutlineParseError::Shape(
            "missing \"slides\" field".to_string(),
        ));
    }

    let mut outline: PresentationOutline =
        serde_json::from_value(value).map_err(|e| OutlineParseError::Shape(e.to_string()))?;
    outline.slides.truncate(max_slides as usize);
    Ok(outline)
}

/// Title from the first non-blank line of the first slide
pub fn derive_title(outline: &PresentationOutline) -> String {
    outline
        .slides
        .first()
        .and_then(|slide| {
            slide
                .content
                .lines()
                .map(clean_title_line)
                .find(|line| !line.is_empty())
        })
        .map(|line| truncate_chars(&line, TITLE_MAX_CHARS).trim_end().to_string())
        .unwrap_or_else(|| UNTITLED_PRESENTATION.to_string())
}

fn clean_title_line(line: &str) -> String {
    line.replace(['#', '/', '\\'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outline Stream Orchestrator.
///
/// Drives one presentation from attachment loading through research,
/// generation, parsing and persistence, emitting [`StreamEvent`]s as it goes.
/// Every path ends with exactly one `Error` or `Complete`.
#[derive(Clone)]
pub struct OutlineStreamer {
    store: Arc<dyn PresentationStore>,
    researcher: Arc<dyn Researcher>,
    generator: Arc<dyn OutlineGenerator>,
    documents: DocumentsLoader,
}

impl OutlineStreamer {
    pub fn new(
        store: Arc<dyn PresentationStore>,
        researcher: Arc<dyn Researcher>,
        generator: Arc<dyn OutlineGenerator>,
        documents: DocumentsLoader,
    ) -> Self {
        Self {
            store,
            researcher,
            generator,
            documents,
        }
    }

    /// Look up the presentation and prepare its stream.
    ///
    /// An unknown id is reported here, before any event is produced.
    pub async fn open(&self, id: Uuid) -> Result<EventStream> {
        let presentation = self
            .store
            .get_presentation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Presentation {} not found", id)))?;

        let temp_dir = tempfile::Builder::new()
            .prefix("decksmith-")
            .tempdir()
            .map_err(|e| AppError::Internal(format!("Failed to create temp directory: {}", e)))?;

        Ok(Box::pin(self.clone().run(presentation, temp_dir)))
    }

    /// The state machine itself. `temp_dir` is owned by this stream and removed
    /// when the stream is dropped, finished or not.
    pub fn run(
        self,
        presentation: Presentation,
        temp_dir: TempDir,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        stream! {
            let request = OutlineGenerationRequest::from(&presentation);
            let id = request.presentation_id;
            info!(presentation_id = %id, n_slides = request.n_slides, "Outline stream started");

            yield StreamEvent::status(STATUS_GENERATING);

            let mut attachments = String::new();
            if !request.file_paths.is_empty() {
                yield StreamEvent::status(STATUS_LOADING_DOCUMENTS);

                match self.documents.load_documents(&request.file_paths, temp_dir.path()).await {
                    Ok(documents) => attachments = documents.join("\n\n"),
                    Err(e) => {
                        error!(presentation_id = %id, error = %e, "Failed to load attachments");
                        yield StreamEvent::error(e.to_string());
                        return;
                    }
                }
            }

            let mut research = String::new();
            if request.web_search {
                yield StreamEvent::status(STATUS_RESEARCHING);

                let outcome = AssertUnwindSafe(self.researcher.research(&request.content))
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(bundle)) if !bundle.is_empty() => {
                        info!(
                            presentation_id = %id,
                            sources = bundle.sources.len(),
                            "Research completed"
                        );
                        research = bundle.summary;
                        yield StreamEvent::status(STATUS_RESEARCH_FOUND);
                    }
                    Ok(Ok(_)) => {
                        info!(presentation_id = %id, "Research found nothing");
                        yield StreamEvent::status(STATUS_RESEARCH_EMPTY);
                    }
                    Ok(Err(e)) => {
                        warn!(presentation_id = %id, error = %e, "Research failed; continuing without it");
                        yield StreamEvent::status(STATUS_RESEARCH_FAILED);
                    }
                    Err(_) => {
                        warn!(presentation_id = %id, "Research panicked; continuing without it");
                        yield StreamEvent::status(STATUS_RESEARCH_FAILED);
                    }
                }
            }

            let context = merge_context(&attachments, &research);
            let n_slides = slides_to_generate(request.n_slides, request.include_table_of_contents);

            let mut chunks = match self.generator.generate(&request, n_slides, &context).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    error!(presentation_id = %id, error = %e, "Outline generation failed to start");
                    yield StreamEvent::error(e.to_string());
                    return;
                }
            };

            let mut accumulated = String::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => {
                        accumulated.push_str(&text);
                        yield StreamEvent::Chunk(text);
                        tokio::task::yield_now().await;
                    }
                    Err(e) => {
                        error!(presentation_id = %id, error = %e, "Outline generation failed mid-stream");
                        yield StreamEvent::error(e.to_string());
                        return;
                    }
                }
            }

            let outline = match parse_outline(&accumulated, n_slides) {
                Ok(outline) => outline,
                Err(e) => {
                    error!(presentation_id = %id, error = %e, "Failed to parse outline");
                    yield StreamEvent::error(format!(
                        "Failed to generate presentation outlines. Please try again. {}",
                        e
                    ));
                    return;
                }
            };

            let title = derive_title(&outline);

            // Encode before writing so a failure here leaves the record untouched.
            let mut candidate = presentation.clone();
            candidate.outlines = Some(outline.clone());
            candidate.title = Some(title.clone());
            let encoded = match serde_json::to_value(&candidate) {
                Ok(value) => value,
                Err(e) => {
                    error!(presentation_id = %id, error = %e, "Failed to encode presentation");
                    yield StreamEvent::error(format!("Failed to encode presentation: {}", e));
                    return;
                }
            };

            let value = match self.store.save_outline(id, &outline, &title).await {
                Ok(updated) => serde_json::to_value(&updated).unwrap_or(encoded),
                Err(e) => {
                    error!(presentation_id = %id, error = %e, "Failed to persist outline");
                    yield StreamEvent::error(format!("Failed to save presentation outlines. {}", e));
                    return;
                }
            };

            info!(
                presentation_id = %id,
                slides = outline.slides.len(),
                title = %title,
                "Outline stream completed"
            );
            yield StreamEvent::Complete {
                key: "presentation".to_string(),
                value,
            };

            drop(temp_dir);
        }
    }
}
