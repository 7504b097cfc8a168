//! The `source -> {stdout, stderr, exit_code}` contract.
//!
//! Lexing, parsing and analysis all finish before the interpreter starts, so
//! a program rejected by any of them never prints anything. The whole run
//! happens on a dedicated worker thread whose stack is sized by [`Limits`].

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use log::{debug, error, info};
use serde::Serialize;

use crate::analyzer::analyze;
use crate::ast::Program;
use crate::error::{Error, Result};
use crate::interpreter::{DEFAULT_MAX_CALL_DEPTH, Interpreter};
use crate::lexer::tokenize;
use crate::parser::{DEFAULT_MAX_NESTING, Parser};

pub const DEFAULT_STACK_SIZE: usize = 64 * 1024 * 1024;
/// Worker stack reserved for each level of parser nesting or evaluation
/// depth. Covers the widest frame chain between two counted levels.
pub const STACK_BYTES_PER_LEVEL: usize = 32 * 1024;

/// Resource bounds applied to one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    pub max_nesting_depth: usize,
    /// Stack size of the worker thread, in bytes.
    pub stack_size: usize,
    pub max_output_bytes: Option<usize>,
}

impl Limits {
    /// Evaluation depth the worker stack can hold. Call depth and block or
    /// expression nesting all draw from this one budget.
    pub fn max_eval_depth(&self) -> usize {
        self.stack_size / STACK_BYTES_PER_LEVEL
    }

    /// `max_nesting_depth`, clamped so that a parsed tree always fits the
    /// worker stack while it is analyzed and evaluated.
    pub fn effective_nesting_depth(&self) -> usize {
        self.max_nesting_depth.min(self.max_eval_depth())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nesting_depth: DEFAULT_MAX_NESTING,
            stack_size: DEFAULT_STACK_SIZE,
            max_output_bytes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl RunOutcome {
    pub const FAILURE_EXIT_CODE: i32 = -1;

    fn success(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            exit_code: 0,
        }
    }

    fn failure(stdout: String, error: &Error) -> Self {
        Self {
            stdout,
            stderr: error.render(),
            exit_code: Self::FAILURE_EXIT_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Lexes, parses and analyzes `source` without running it.
pub fn compile(source: &str) -> Result<Program> {
    compile_with_limits(source, &Limits::default())
}

pub fn compile_with_limits(source: &str, limits: &Limits) -> Result<Program> {
    let tokens = tokenize(source)?;
    let program = Parser::new(tokens)
        .with_max_depth(limits.effective_nesting_depth())
        .parse_program()?;
    analyze(&program)?;
    Ok(program)
}

pub fn run(source: &str) -> RunOutcome {
    run_with_limits(source, &Limits::default())
}

pub fn run_with_limits(source: &str, limits: &Limits) -> RunOutcome {
    let limits = *limits;
    let source = source.to_string();
    let worker = thread::Builder::new()
        .name("tinylang-run".to_string())
        .stack_size(limits.stack_size)
        .spawn(move || {
            panic::catch_unwind(AssertUnwindSafe(|| run_on_current_thread(&source, &limits)))
        });

    let joined = match worker {
        Ok(handle) => handle.join(),
        Err(spawn_error) => {
            let error = Error::Internal(format!("failed to start worker thread: {spawn_error}"));
            return RunOutcome::failure(String::new(), &error);
        }
    };
    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) | Err(payload) => {
            let error = Error::Internal(format!("run panicked: {}", panic_message(&*payload)));
            error!("{}", error.render());
            RunOutcome::failure(String::new(), &error)
        }
    }
}

fn run_on_current_thread(source: &str, limits: &Limits) -> RunOutcome {
    let started = Instant::now();
    let program = match compile_with_limits(source, limits) {
        Ok(program) => program,
        Err(error) => {
            debug!("rejected before execution: {}", error.render());
            return RunOutcome::failure(String::new(), &error);
        }
    };

    let execution = Interpreter::new()
        .with_max_call_depth(limits.max_call_depth)
        .with_max_eval_depth(limits.max_eval_depth())
        .with_max_output_bytes(limits.max_output_bytes)
        .run(&program);
    info!("run finished in {:?}", started.elapsed());

    match execution.result {
        Ok(()) => RunOutcome::success(execution.stdout),
        Err(error) => RunOutcome::failure(execution.stdout, &Error::from(error)),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
