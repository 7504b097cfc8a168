use std::fmt;

use thiserror::Error;

use crate::analyzer::SemanticError;
use crate::interpreter::RuntimeError;
use crate::lexer::LexError;
use crate::parser::SyntaxError;

/// Diagnostic class shown in front of every rendered error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Syntax,
    Name,
    Type,
    Index,
    DivisionByZero,
    Runtime,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lex => "LexError",
            Self::Syntax => "SyntaxError",
            Self::Name => "NameError",
            Self::Type => "TypeError",
            Self::Index => "IndexError",
            Self::DivisionByZero => "DivisionByZero",
            Self::Runtime => "RuntimeError",
            Self::Internal => "InternalError",
        })
    }
}

/// Any failure of the pipeline, tagged with the stage that raised it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lex(_) => ErrorKind::Lex,
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::Semantic(error) => error.kind(),
            Self::Runtime(error) => error.kind(),
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Source line the diagnostic points at, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lex(error) => Some(error.line()),
            Self::Syntax(error) => Some(error.line()),
            Self::Semantic(error) => Some(error.line()),
            Self::Runtime(error) => error.line(),
            Self::Internal(_) => None,
        }
    }

    /// The line written to stderr: `<Kind>: <message>`.
    pub fn render(&self) -> String {
        format!("{}: {self}", self.kind())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prefixes_the_kind() {
        let error = Error::from(SyntaxError::UnexpectedToken {
            expected: "';'",
            found: "'print'",
            line: 2,
        });
        assert_eq!(error.kind(), ErrorKind::Syntax);
        assert_eq!(error.line(), Some(2));
        assert_eq!(
            error.render(),
            "SyntaxError: expected ';' but found 'print' at line 2"
        );
    }

    #[test]
    fn runtime_errors_keep_their_own_class() {
        let error = Error::from(RuntimeError::IndexOutOfBounds {
            index: 5,
            len: 3,
            line: 1,
        });
        assert_eq!(error.kind(), ErrorKind::Index);
        assert_eq!(
            error.render(),
            "IndexError: index 5 out of bounds for array of length 3 at line 1"
        );
        let internal = Error::Internal("worker panicked".to_string());
        assert_eq!(internal.render(), "InternalError: worker panicked");
        assert_eq!(internal.line(), None);
    }
}
