use crate::llm::{LLMClientFactory, LLMStream};
use crate::types::{OutlineGenerationRequest, Result};
use crate::utils::toml_config::{DecksmithConfigManager, OUTLINE_MODEL};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Produces the outline as a lazy sequence of text fragments.
///
/// The returned stream is finite and cannot be restarted. An `Err` item is a
/// fatal signal: the consumer stops at the first one.
#[async_trait]
pub trait OutlineGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &OutlineGenerationRequest,
        n_slides: u32,
        additional_context: &str,
    ) -> Result<LLMStream>;
}

/// Streams outlines from the configured `outline` model
pub struct LlmOutlineGenerator {
    config: Arc<DecksmithConfigManager>,
}

impl LlmOutlineGenerator {
    pub fn new(config: Arc<DecksmithConfigManager>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl OutlineGenerator for LlmOutlineGenerator {
    async fn generate(
        &self,
        request: &OutlineGenerationRequest,
        n_slides: u32,
        additional_context: &str,
    ) -> Result<LLMStream> {
        let config = self.config.config();
        let client = LLMClientFactory::from_config(&config, OUTLINE_MODEL)?
            .create_default()
            .await?;

        info!(
            presentation_id = %request.presentation_id,
            model = client.model_name(),
            n_slides,
            "Requesting outline stream"
        );

        let system = system_prompt(request, n_slides);
        let user = user_prompt(request, n_slides, additional_context);
        client.stream_with_system(&system, &user).await
    }
}

pub fn system_prompt(request: &OutlineGenerationRequest, n_slides: u32) -> String {
    let mut prompt = format!(
        r#"You are an expert presentation writer. Create an outline for a presentation of exactly {n_slides} slides in {language}.

Respond with JSON only, in this shape:
{{"slides": [{{"content": "<markdown for the slide>"}}]}}

Rules:
- Produce exactly {n_slides} entries in "slides".
- Each slide's content starts with a markdown heading followed by concise bullet points.
- Write every slide in {language}.
- Do not wrap the JSON in code fences or add commentary."#,
        n_slides = n_slides,
        language = request.language,
    );

    if request.include_title_slide {
        prompt.push_str("\n- The first slide is a title slide with the presentation title and a subtitle.");
    } else {
        prompt.push_str("\n- Do not include a title slide; start directly with content.");
    }
    if let Some(tone) = non_blank(&request.tone) {
        prompt.push_str(&format!("\n- Use a {} tone.", tone));
    }
    if let Some(verbosity) = non_blank(&request.verbosity) {
        prompt.push_str(&format!("\n- Keep slide text {}.", verbosity));
    }
    if request.web_search {
        prompt.push_str(
            "\n- Ground the slides in the provided research context and prefer its facts over general knowledge.",
        );
    }
    if let Some(instructions) = non_blank(&request.instructions) {
        prompt.push_str(&format!("\n\nAdditional instructions:\n{}", instructions));
    }

    prompt.push_str(&format!("\n\nCurrent date: {}", Utc::now().format("%Y-%m-%d")));
    prompt
}

pub fn user_prompt(
    request: &OutlineGenerationRequest,
    n_slides: u32,
    additional_context: &str,
) -> String {
    let mut prompt = format!(
        "Topic:\n{}\n\nNumber of slides: {}",
        request.content.trim(),
        n_slides
    );

    if !additional_context.trim().is_empty() {
        prompt.push_str("\n\nContext:\n");
        prompt.push_str(additional_context);
    }

    prompt
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
