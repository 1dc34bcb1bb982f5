use cfgx_syntax::ParseError;
use thiserror::Error;

use crate::path::Path;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid override: {0}")]
    MalformedOverride(String),

    #[error("Delete overrides must not include a value: {0}")]
    DeleteWithValue(String),

    #[error("Index {index} out of range at {path} (length {len})")]
    IndexOutOfRange { path: Path, index: i64, len: usize },

    #[error("Target is not a list: {0}")]
    NotAList(Path),

    #[error("Target is not a mapping: {0}")]
    NotAMapping(Path),

    #[error("Lazy cycle detected at {0}")]
    CycleDetected(Path),

    #[error("No such key: {0}")]
    MissingKey(Path),

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid lazy expression {source_text:?}: {error}")]
    InvalidExpression {
        source_text: String,
        error: ParseError,
    },

    #[error("Not a literal value: {0}")]
    NotALiteral(String),

    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("Error evaluating expression: {0}")]
    Evaluation(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Parent cycle detected at {0}")]
    ParentCycle(String),

    #[error("Invalid config document {location}: {reason}")]
    InvalidDocument { location: String, reason: String },
}

pub type ConfigResult<T> = anyhow::Result<T>;

/// Shorthand for an [`ConfigError::Evaluation`] wrapped in an `anyhow::Error`.
pub(crate) fn eval_error<S: Into<String>>(message: S) -> anyhow::Error {
    ConfigError::Evaluation(message.into()).into()
}
