//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("value not found: {key}")]
    ValueNotFound { key: String },

    #[error("required value not provided: {key}")]
    RequiredValueNotProvided { key: String },

    #[error("environment variable not set: {name}")]
    EnvNotSet { name: String },

    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("command failed: {command} (exit code {code:?})\n{output}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("unable to start command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("registry not found: {name}")]
    RegistryNotFound { name: String },

    #[error("unable to load '{path}' from registry '{registry}': {message}")]
    RegistryLoad {
        registry: String,
        path: String,
        message: String,
    },

    #[error("artifact not found: {url}")]
    ArtifactNotFound { url: String },

    #[error("no {0} configured")]
    MissingCollaborator(&'static str),

    #[error("operation timed out after {0}")]
    Timeout(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Check if this is a cancellation, so callers can stop without wrapping it
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
