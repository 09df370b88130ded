//! CLI error types with exit code handling
//!
//! Library errors from every layer are folded into one [`CliError`] whose
//! variant decides the process exit code.

use miette::Diagnostic;
use thiserror::Error;
use valet_cluster::ClusterError;
use valet_core::CoreError;
use valet_engine::{EngineError, TemplateError};
use valet_workflow::WorkflowError;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// A value or document failed to render
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(Box<TemplateError>),

    #[error("Required value not provided: {key}")]
    #[diagnostic(
        code(valet::cli::required_value),
        help("pass it with --set {key}=<value> or add it to the config values")
    )]
    RequiredValue { key: String },

    /// Invalid or ambiguous configuration document
    #[error("Configuration error: {message}")]
    #[diagnostic(code(valet::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid command-line arguments
    #[error("{message}")]
    #[diagnostic(code(valet::cli::usage))]
    Usage { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(valet::cli::io))]
    Io { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(valet::cli::cancelled))]
    Cancelled,

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(valet::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::RequiredValue { .. } => exit_codes::PRECONDITION_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    fn other(err: impl std::fmt::Display) -> Self {
        Self::Other {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RequiredValueNotProvided { key } => CliError::RequiredValue { key },
            CoreError::Cancelled => CliError::Cancelled,
            CoreError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            e @ (CoreError::YamlParse(_)
            | CoreError::RegistryNotFound { .. }
            | CoreError::InvalidValue { .. }) => CliError::config(e.to_string()),
            e => CliError::other(e),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(e) => CliError::Template(Box::new(e)),
            EngineError::Core(e) => e.into(),
            e @ EngineError::CyclicValue { .. } => CliError::Config {
                message: e.to_string(),
                help: Some("break the chain so every key: or template: reference ends in a literal".to_string()),
            },
        }
    }
}

impl From<WorkflowError> for CliError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Engine(e) => e.into(),
            WorkflowError::Core(e) => e.into(),
            e @ (WorkflowError::InvalidConfig(_)
            | WorkflowError::Parse { .. }
            | WorkflowError::Yaml(_)) => CliError::config(e.to_string()),
            e => CliError::other(e),
        }
    }
}

impl From<ClusterError> for CliError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Workflow(e) => e.into(),
            ClusterError::Engine(e) => e.into(),
            ClusterError::Core(e) => e.into(),
            e @ (ClusterError::InvalidConfig(_) | ClusterError::Parse { .. }) => {
                CliError::config(e.to_string())
            }
            e => CliError::other(e),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
