//! Error types for valet-cluster

use thiserror::Error;
use valet_core::CoreError;
use valet_engine::EngineError;
use valet_workflow::WorkflowError;

/// Result type for valet-cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClusterError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A remote cluster operation did not finish in time
    #[error("{operation} did not finish within {timeout}")]
    Timeout { operation: String, timeout: String },

    #[error("invalid cluster configuration: {0}")]
    InvalidConfig(String),

    #[error("unexpected output from {command}: {message}")]
    UnexpectedOutput { command: String, message: String },

    #[error("unable to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A parallel branch panicked or was aborted
    #[error("cluster branch failed to complete: {0}")]
    Branch(String),
}

impl ClusterError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            ClusterError::Workflow(e) => e.is_cancelled(),
            ClusterError::Engine(e) => e.is_cancelled(),
            ClusterError::Core(e) => e.is_cancelled(),
            _ => false,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ClusterError::InvalidConfig(message.into())
    }
}

/// True when a failed command reported that the cluster does not exist
pub(crate) fn is_not_found(err: &CoreError, markers: &[&str]) -> bool {
    match err {
        CoreError::CommandFailed { output, .. } => {
            let output = output.to_lowercase();
            markers.iter().any(|m| output.contains(&m.to_lowercase()))
        }
        _ => false,
    }
}
