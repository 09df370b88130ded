//! Engine error types

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use valet_core::CoreError;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("cyclic value reference: {}", chain.join(" -> "))]
    CyclicValue { chain: Vec<String> },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Check if the underlying failure was a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Core(e) if e.is_cancelled())
    }
}

/// Error kind for categorizing template errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    SyntaxError,
    InvalidOperation,
    Other,
}

/// Template failure with the offending source attached
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("template error in {name}: {message}")]
#[diagnostic(code(valet::template::render))]
pub struct TemplateError {
    pub name: String,

    pub message: String,

    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    pub fn from_minijinja(err: minijinja::Error, name: &str, source: &str) -> Self {
        let kind = match err.kind() {
            minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
            minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
            minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
            minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::InvalidOperation,
            _ => TemplateErrorKind::Other,
        };

        let suggestion = match kind {
            TemplateErrorKind::UndefinedVariable => Some(
                "every placeholder must name a known value; set it in the workflow values or pass --set"
                    .to_string(),
            ),
            TemplateErrorKind::UnknownFilter => Some(format!(
                "available filters: {}",
                crate::engine::FILTERS.join(", ")
            )),
            _ => None,
        };

        Self {
            name: name.to_string(),
            message: err.detail().map(str::to_string).unwrap_or_else(|| err.to_string()),
            kind,
            src: NamedSource::new(name, source.to_string()),
            span: err.line().and_then(|line| line_span(source, line)),
            suggestion,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

fn line_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (idx, line) in source.lines().enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }
    None
}

pub type Result<T> = std::result::Result<T, EngineError>;
