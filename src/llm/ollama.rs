use crate::llm::client::{LLMClient, LLMStream};
use crate::types::{AppError, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let (host, port) = split_host_port(&base_url);
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }

    async fn chat_stream(&self, messages: Vec<ChatMessage>) -> Result<LLMStream> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let mut stream_response = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama stream error: {}", e)))?;

        let output_stream = stream! {
            while let Some(chunk_result) = stream_response.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let content = chunk.message.content;
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                    Err(_) => {
                        yield Err(AppError::LLM("Stream chunk error".to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }
}

/// Split `scheme://host:port` into the `(scheme://host, port)` pair ollama-rs wants.
fn split_host_port(base_url: &str) -> (String, u16) {
    let trimmed = base_url.trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", trimmed),
    };

    match rest.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (format!("{}://{}", scheme, host), port),
            Err(_) => (format!("{}://{}", scheme, rest), 11434),
        },
        None => (format!("{}://{}", scheme, rest), 11434),
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())])
            .await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    async fn stream(&self, prompt: &str) -> Result<LLMStream> {
        self.chat_stream(vec![ChatMessage::user(prompt.to_string())])
            .await
    }

    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<LLMStream> {
        self.chat_stream(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::split_host_port;

    #[test]
    fn test_url_parsing_full() {
        assert_eq!(
            split_host_port("http://localhost:11434"),
            ("http://localhost".to_string(), 11434)
        );
    }

    #[test]
    fn test_url_parsing_no_port() {
        assert_eq!(
            split_host_port("http://localhost"),
            ("http://localhost".to_string(), 11434)
        );
    }

    #[test]
    fn test_url_parsing_custom_port_and_trailing_slash() {
        assert_eq!(
            split_host_port("https://gpu-box:8080/"),
            ("https://gpu-box".to_string(), 8080)
        );
    }

    #[test]
    fn test_url_parsing_without_scheme() {
        assert_eq!(
            split_host_port("ollama:11500"),
            ("http://ollama".to_string(), 11500)
        );
    }
}
