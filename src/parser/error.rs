use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("expected {expected} but found {found} at line {line}")]
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
        line: usize,
    },
    #[error("unexpected token {found} at start of statement at line {line}")]
    UnexpectedStatement { found: &'static str, line: usize },
    #[error("unexpected token {found} in expression at line {line}")]
    UnexpectedExpression { found: &'static str, line: usize },
    #[error("nesting deeper than {limit} levels at line {line}")]
    NestingTooDeep { limit: usize, line: usize },
}

impl SyntaxError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedToken { line, .. }
            | Self::UnexpectedStatement { line, .. }
            | Self::UnexpectedExpression { line, .. }
            | Self::NestingTooDeep { line, .. } => *line,
        }
    }
}

pub type ParseResult<T> = Result<T, SyntaxError>;
