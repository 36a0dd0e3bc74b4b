use crate::llm::LLMClient;
use crate::utils::toml_config::SummarizerConfig;
use std::time::Duration;
use tracing::{info, warn};

const SUMMARIZER_SYSTEM_PROMPT: &str = "You condense research notes for a presentation writer. \
Keep concrete facts, figures, dates and names. Drop repetition and boilerplate. \
Respond with a structured digest: short topical headings, each followed by bullet points, \
and end with a 'Sources' list of the URLs you relied on.";

/// Condenses an oversized research corpus into a bounded digest.
///
/// Falls back to a prefix of the raw input when the backend fails, times out
/// or returns nothing.
pub struct Summarizer {
    llm: Box<dyn LLMClient>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(llm: Box<dyn LLMClient>, config: SummarizerConfig) -> Self {
        Self { llm, config }
    }

    /// Whether `text` is large enough to be worth condensing
    pub fn should_condense(&self, text: &str) -> bool {
        text.chars().count() > self.config.threshold_chars
    }

    pub async fn condense(&self, raw: &str) -> String {
        let capped = truncate_chars(raw, self.config.combined_cap_chars);
        let prompt = format!(
            "Condense the following research into at most {} characters.\n\n{}",
            self.config.final_cap_chars, capped
        );

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(
            timeout,
            self.llm.generate_with_system(SUMMARIZER_SYSTEM_PROMPT, &prompt),
        )
        .await
        {
            Ok(Ok(digest)) if !digest.trim().is_empty() => {
                info!(
                    model = self.llm.model_name(),
                    input_chars = capped.chars().count(),
                    "Research condensed"
                );
                truncate_chars(digest.trim(), self.config.final_cap_chars).to_string()
            }
            Ok(Ok(_)) => {
                warn!("Summarizer returned an empty digest; truncating research instead");
                self.fallback(raw)
            }
            Ok(Err(e)) => {
                warn!("Summarizer failed: {}; truncating research instead", e);
                self.fallback(raw)
            }
            Err(_) => {
                warn!(
                    "Summarizer timed out after {:?}; truncating research instead",
                    timeout
                );
                self.fallback(raw)
            }
        }
    }

    fn fallback(&self, raw: &str) -> String {
        truncate_chars(raw, self.config.final_cap_chars).to_string()
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMStream;
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct ScriptedLLM {
        reply: Result<String>,
        delay: Duration,
        seen_prompt: Arc<Mutex<Option<String>>>,
    }

    impl ScriptedLLM {
        fn replying(reply: Result<String>) -> Self {
            Self {
                reply,
                delay: Duration::ZERO,
                seen_prompt: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLLM {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.generate_with_system("", prompt).await
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            *self.seen_prompt.lock().unwrap() = Some(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AppError::LLM(e.to_string())),
            }
        }

        async fn stream(&self, _prompt: &str) -> Result<LLMStream> {
            Err(AppError::LLM("not streaming".to_string()))
        }

        async fn stream_with_system(&self, _system: &str, _prompt: &str) -> Result<LLMStream> {
            Err(AppError::LLM("not streaming".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn config() -> SummarizerConfig {
        SummarizerConfig {
            enabled: true,
            threshold_chars: 50,
            combined_cap_chars: 40,
            final_cap_chars: 10,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ünïcödé", 3), "ünï");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_should_condense_threshold() {
        let summarizer = Summarizer::new(Box::new(ScriptedLLM::replying(Ok("x".into()))), config());
        assert!(!summarizer.should_condense(&"a".repeat(50)));
        assert!(summarizer.should_condense(&"a".repeat(51)));
    }

    #[tokio::test]
    async fn test_condense_caps_input_and_output() {
        let llm = ScriptedLLM::replying(Ok("  a digest that is far too long  ".to_string()));
        let seen = Arc::clone(&llm.seen_prompt);
        let summarizer = Summarizer::new(Box::new(llm), config());

        let raw = "x".repeat(100);
        let digest = summarizer.condense(&raw).await;

        assert_eq!(digest, "a digest t");
        let prompt = seen.lock().unwrap().clone().unwrap();
        assert!(prompt.ends_with(&"x".repeat(40)));
        assert!(!prompt.contains(&"x".repeat(41)));
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_prefix() {
        let llm = ScriptedLLM::replying(Err(AppError::LLM("backend down".to_string())));
        let summarizer = Summarizer::new(Box::new(llm), config());

        let raw = "0123456789abcdefghijklmnopqrstuvwxyz".repeat(3);
        assert_eq!(summarizer.condense(&raw).await, "0123456789");
    }

    #[tokio::test]
    async fn test_empty_digest_falls_back_to_prefix() {
        let summarizer = Summarizer::new(Box::new(ScriptedLLM::replying(Ok("   ".into()))), config());
        assert_eq!(summarizer.condense("abcdefghijklmnop").await, "abcdefghij");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_prefix() {
        let mut llm = ScriptedLLM::replying(Ok("never seen".to_string()));
        llm.delay = Duration::from_secs(60);
        let summarizer = Summarizer::new(Box::new(llm), config());

        assert_eq!(summarizer.condense("abcdefghijklmnop").await, "abcdefghij");
    }

    #[tokio::test]
    async fn test_fallback_of_empty_input_is_empty() {
        let llm = ScriptedLLM::replying(Err(AppError::LLM("down".to_string())));
        let summarizer = Summarizer::new(Box::new(llm), config());
        assert_eq!(summarizer.condense("").await, "");
    }
}
