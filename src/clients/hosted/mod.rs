
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ChatClient, ChatMessage, EmbeddingClient, build_agent, join_url, post_json};
use crate::config::HostedConfig;
use crate::{RagError, Result};

/// Client for an OpenAI-compatible inference API using bearer authentication
#[derive(Clone)]
pub struct HostedClient {
    base_url: Url,
    token: String,
    chat_model: String,
    embedding_model: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for HostedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedClient")
            .field("base_url", &self.base_url.as_str())
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl HostedClient {
    #[inline]
    pub fn new(config: &HostedConfig, token: &str) -> Result<Self> {
        Ok(Self {
            base_url: config.endpoint_url()?,
            token: token.to_string(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }
}

#[async_trait]
impl EmbeddingClient for HostedClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = join_url(&self.base_url, "embeddings")?;
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse =
            post_json(&self.agent, url, Some(&self.token), &request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| RagError::Service("Embedding response contained no data".to_string()))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl ChatClient for HostedClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} (prompt length: {})",
            self.chat_model,
            prompt.len()
        );

        let url = join_url(&self.base_url, "chat/completions")?;
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage::user(prompt)],
        };

        let response: ChatResponse =
            post_json(&self.agent, url, Some(&self.token), &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Service("Completion response contained no message".to_string()))
    }
}
