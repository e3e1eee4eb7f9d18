// Model clients
// Embedding and chat completion backends: a hosted OpenAI-compatible API or a local Ollama server

pub mod hosted;
pub mod ollama;


use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, ConfigError, HostedConfig, LocalConfig};
use crate::{RagError, Result};

pub use hosted::HostedClient;
pub use ollama::OllamaClient;

/// Turns a piece of text into a vector
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Single-shot, non-streaming chat completion
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Which built-in sample to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Hosted OpenAI-compatible API, authenticated with `GitHubModels:Token`
    Hosted,
    /// Local Ollama server, no authentication
    Local,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Hosted, Variant::Local];

    #[inline]
    pub fn sample_name(self) -> &'static str {
        match self {
            Self::Hosted => "Text Embedding",
            Self::Local => "Text Embedding Ollama",
        }
    }
}

impl fmt::Display for Variant {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sample_name())
    }
}

/// A fully resolved backend: everything needed to build clients without touching config again
#[derive(Clone)]
pub enum Backend {
    Hosted {
        token: String,
        settings: HostedConfig,
    },
    Local(LocalConfig),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hosted { settings, .. } => f
                .debug_struct("Hosted")
                .field("token", &"<redacted>")
                .field("settings", settings)
                .finish(),
            Self::Local(settings) => f.debug_tuple("Local").field(settings).finish(),
        }
    }
}

impl Backend {
    /// Resolve the backend for `variant`, reading the token from the environment and secret store
    #[inline]
    pub fn resolve(config: &Config, variant: Variant) -> Result<Self, ConfigError> {
        Self::resolve_with(config, variant, |name| std::env::var(name).ok())
    }

    /// Resolve the backend with a caller-supplied environment lookup
    #[inline]
    pub fn resolve_with<F>(config: &Config, variant: Variant, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match variant {
            Variant::Hosted => Ok(Self::Hosted {
                token: config.github_token_with(env)?,
                settings: config.hosted.clone(),
            }),
            Variant::Local => Ok(Self::Local(config.local.clone())),
        }
    }

    #[inline]
    pub fn embedding_dimension(&self) -> usize {
        match self {
            Self::Hosted { settings, .. } => settings.embedding_dimension as usize,
            Self::Local(settings) => settings.embedding_dimension as usize,
        }
    }

    #[inline]
    pub fn chat_model(&self) -> &str {
        match self {
            Self::Hosted { settings, .. } => &settings.chat_model,
            Self::Local(settings) => &settings.chat_model,
        }
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        match self {
            Self::Hosted { settings, .. } => &settings.embedding_model,
            Self::Local(settings) => &settings.embedding_model,
        }
    }
}

/// Builds clients for a resolved backend
pub trait ClientFactory: Send + Sync {
    fn chat_client(&self, backend: &Backend) -> Result<Box<dyn ChatClient>>;
    fn embedding_client(&self, backend: &Backend) -> Result<Box<dyn EmbeddingClient>>;
}

/// Factory producing the real HTTP clients
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    #[inline]
    fn chat_client(&self, backend: &Backend) -> Result<Box<dyn ChatClient>> {
        create_chat_client(backend)
    }

    #[inline]
    fn embedding_client(&self, backend: &Backend) -> Result<Box<dyn EmbeddingClient>> {
        create_embedding_client(backend)
    }
}

#[inline]
pub fn create_chat_client(backend: &Backend) -> Result<Box<dyn ChatClient>> {
    Ok(match backend {
        Backend::Hosted { token, settings } => Box::new(HostedClient::new(settings, token)?),
        Backend::Local(settings) => Box::new(OllamaClient::new(settings)?),
    })
}

#[inline]
pub fn create_embedding_client(backend: &Backend) -> Result<Box<dyn EmbeddingClient>> {
    Ok(match backend {
        Backend::Hosted { token, settings } => Box::new(HostedClient::new(settings, token)?),
        Backend::Local(settings) => Box::new(OllamaClient::new(settings)?),
    })
}

/// One chat turn as both backends put it on the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.to_string()),
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// POST a JSON body and decode the JSON reply.
///
/// The request runs on the blocking pool. There is no retry: transport failures
/// and 5xx/429 replies become `ServiceUnavailable`, anything else `Service`.
async fn post_json<Req, Resp>(
    agent: &ureq::Agent,
    url: Url,
    bearer: Option<&str>,
    body: &Req,
) -> Result<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let request_json = serde_json::to_string(body)
        .map_err(|e| RagError::Service(format!("Failed to serialize request: {e}")))?;
    let authorization = bearer.map(|token| format!("Bearer {token}"));

    debug!("POST {} ({} bytes)", url, request_json.len());

    let agent = agent.clone();
    let target = url.clone();
    let response_text = tokio::task::spawn_blocking(move || {
        let mut request = agent
            .post(target.as_str())
            .header("Content-Type", "application/json");
        if let Some(authorization) = authorization {
            request = request.header("Authorization", authorization);
        }
        request
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
    })
    .await
    .map_err(|e| RagError::Other(anyhow::anyhow!("HTTP worker failed: {e}")))?
    .map_err(|e| classify_error(&url, &e))?;

    serde_json::from_str(&response_text)
        .map_err(|e| RagError::Service(format!("Malformed response from {url}: {e}")))
}

fn classify_error(url: &Url, error: &ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(status) if *status >= 500 || *status == 429 => {
            warn!("Server error (status {}) from {}", status, url);
            RagError::ServiceUnavailable(format!("{url} returned HTTP {status}"))
        }
        ureq::Error::StatusCode(status) => {
            warn!("Client error (status {}) from {}", status, url);
            RagError::Service(format!("{url} returned HTTP {status}"))
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => {
            warn!("Transport error for {}: {}", url, error);
            RagError::ServiceUnavailable(format!("{url}: {error}"))
        }
        _ => RagError::Service(format!("{url}: {error}")),
    }
}

fn join_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|_| RagError::Config(ConfigError::InvalidUrl(format!("{base}{path}"))))
}
