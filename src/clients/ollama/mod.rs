
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ChatClient, ChatMessage, EmbeddingClient, build_agent, join_url, post_json};
use crate::config::LocalConfig;
use crate::{RagError, Result};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    chat_model: String,
    embedding_model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &LocalConfig) -> Result<Self> {
        let base_url = config.ollama_url()?;

        Ok(Self {
            base_url,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaClient {
    /// Generate an embedding for a single text input
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = join_url(&self.base_url, "/api/embed")?;
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbedResponse = post_json(&self.agent, url, None, &request).await?;

        let embedding = response.embeddings.into_iter().next().ok_or_else(|| {
            RagError::Service("Ollama returned no embeddings for the input".to_string())
        })?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} (prompt length: {})",
            self.chat_model,
            prompt.len()
        );

        let url = join_url(&self.base_url, "/api/chat")?;
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage::user(prompt)],
            stream: false,
        };

        let response: ChatResponse = post_json(&self.agent, url, None, &request).await?;

        response
            .message
            .content
            .ok_or_else(|| RagError::Service("Ollama returned an empty message".to_string()))
    }
}
