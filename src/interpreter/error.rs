use thiserror::Error;

use crate::error::ErrorKind;

/// Failures that can only be detected while the program runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("index {index} out of bounds for array of length {len} at line {line}")]
    IndexOutOfBounds { index: i64, len: usize, line: usize },
    #[error("division by zero at line {line}")]
    DivisionByZero { line: usize },
    #[error("integer overflow at line {line}")]
    Overflow { line: usize },
    #[error("function '{name}' did not return a value at line {line}")]
    MissingReturnValue { name: String, line: usize },
    #[error("maximum call depth of {limit} exceeded at line {line}")]
    RecursionLimit { limit: usize, line: usize },
    #[error("evaluation nested deeper than {limit} levels at line {line}")]
    EvaluationTooDeep { limit: usize, line: usize },
    #[error("output exceeded {limit} bytes at line {line}")]
    OutputLimit { limit: usize, line: usize },
    #[error("{message}")]
    Internal { message: String },
}

impl RuntimeError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexOutOfBounds { .. } => ErrorKind::Index,
            Self::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            Self::Overflow { .. }
            | Self::MissingReturnValue { .. }
            | Self::RecursionLimit { .. }
            | Self::EvaluationTooDeep { .. }
            | Self::OutputLimit { .. } => ErrorKind::Runtime,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::IndexOutOfBounds { line, .. }
            | Self::DivisionByZero { line }
            | Self::Overflow { line }
            | Self::MissingReturnValue { line, .. }
            | Self::RecursionLimit { line, .. }
            | Self::EvaluationTooDeep { line, .. }
            | Self::OutputLimit { line, .. } => Some(*line),
            Self::Internal { .. } => None,
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
