use std::path::PathBuf;

use thiserror::Error;

use crate::agent::AgentId;

#[derive(Debug, Error)]
pub enum SwarmError {
    /// No metric source answered. Fatal to the current cycle only.
    #[error("reality metrics unavailable: {0}")]
    MetricsUnavailable(String),

    /// Out-of-domain parameter, raised at construction or config load.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// An id that should be live was not in the population.
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl SwarmError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SwarmError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwarmError>;
