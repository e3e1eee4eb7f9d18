use thiserror::Error;

use crate::config::ConfigError;
use crate::pipeline::Stage;

pub type Result<T, E = RagError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{stage} stage failed: {source}")]
    Pipeline {
        stage: Stage,
        #[source]
        source: Box<RagError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether this error (or the error a pipeline stage wrapped) is a configuration fault
    #[inline]
    pub fn is_config(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Pipeline { source, .. } => source.is_config(),
            _ => false,
        }
    }

    #[inline]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub mod clients;
pub mod commands;
pub mod config;
pub mod pipeline;
pub mod store;
