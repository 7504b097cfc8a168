pub mod analyzer;
pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod scope;

pub use error::{Error, ErrorKind, Result};
pub use pipeline::{Limits, RunOutcome, compile, run, run_with_limits};
