//! Error types for valet-workflow

use thiserror::Error;
use valet_core::CoreError;
use valet_engine::EngineError;

/// Result type for valet-workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while ensuring or tearing down resources and workflows
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Condition never reported the expected value
    #[error("condition not met after {timeout}: {target} was '{actual}', expected '{expected}'")]
    ConditionNotMet {
        target: String,
        expected: String,
        actual: String,
        timeout: String,
    },

    #[error("unexpected status code from {url}: expected {expected}, got {actual}")]
    UnexpectedStatusCode { url: String, expected: u16, actual: u16 },

    #[error("unexpected response body from {url}: {message}")]
    UnexpectedResponseBody { url: String, message: String },

    #[error("unable to map {domain} in hosted zone '{hosted_zone}': {message}")]
    DnsMapping {
        domain: String,
        hosted_zone: String,
        message: String,
    },

    /// Document shape is valid YAML but not a valid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unable to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WorkflowError {
    /// Check if the underlying failure was a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            WorkflowError::Core(e) => e.is_cancelled(),
            WorkflowError::Engine(e) => e.is_cancelled(),
            _ => false,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        WorkflowError::InvalidConfig(message.into())
    }
}
