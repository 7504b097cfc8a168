use thiserror::Error;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::ErrorKind;

use super::types::Type;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("variable '{name}' is not defined at line {line}")]
    UndefinedVariable { name: String, line: usize },
    #[error("function '{name}' is not defined at line {line}")]
    UndefinedFunction { name: String, line: usize },
    #[error("variable '{name}' already declared in this scope at line {line}")]
    Redeclaration { name: String, line: usize },
    #[error("function '{name}' is already defined at line {line}")]
    FunctionRedefinition { name: String, line: usize },
    #[error("cannot assign {found} to '{name}' of type {declared} at line {line}")]
    DeclarationMismatch {
        name: String,
        declared: Type,
        found: Type,
        line: usize,
    },
    #[error("cannot assign {found} to {target} at line {line}")]
    AssignmentMismatch {
        target: Type,
        found: Type,
        line: usize,
    },
    #[error("{construct} condition must be bool, but got {found} at line {line}")]
    NonBooleanCondition {
        construct: &'static str,
        found: Type,
        line: usize,
    },
    #[error("unsupported operand types for '{op}': {left} and {right} at line {line}")]
    BinaryOperands {
        op: BinaryOperator,
        left: Type,
        right: Type,
        line: usize,
    },
    #[error("unsupported operand type for '{op}': {operand} at line {line}")]
    UnaryOperand {
        op: UnaryOperator,
        operand: Type,
        line: usize,
    },
    #[error("function '{function}' should return {expected}, but returns {found} at line {line}")]
    ReturnMismatch {
        function: String,
        expected: Type,
        found: Type,
        line: usize,
    },
    #[error("'{name}' is not an array and cannot be indexed at line {line}")]
    NotAnArray { name: String, line: usize },
    #[error("array index must be int, but got {found} at line {line}")]
    NonIntegerIndex { found: Type, line: usize },
    #[error("array elements must all have the same type, found {first} and {other} at line {line}")]
    MixedArrayElements {
        first: Type,
        other: Type,
        line: usize,
    },
    #[error("function '{name}' expects {expected} arguments, got {found} at line {line}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        line: usize,
    },
    #[error("argument {position} of '{name}' expects {expected}, got {found} at line {line}")]
    ArgumentType {
        name: String,
        position: usize,
        expected: Type,
        found: Type,
        line: usize,
    },
    #[error("return statement outside of a function at line {line}")]
    ReturnOutsideFunction { line: usize },
}

impl SemanticError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UndefinedVariable { .. }
            | Self::UndefinedFunction { .. }
            | Self::Redeclaration { .. }
            | Self::FunctionRedefinition { .. } => ErrorKind::Name,
            Self::ReturnOutsideFunction { .. } => ErrorKind::Syntax,
            Self::DeclarationMismatch { .. }
            | Self::AssignmentMismatch { .. }
            | Self::NonBooleanCondition { .. }
            | Self::BinaryOperands { .. }
            | Self::UnaryOperand { .. }
            | Self::ReturnMismatch { .. }
            | Self::NotAnArray { .. }
            | Self::NonIntegerIndex { .. }
            | Self::MixedArrayElements { .. }
            | Self::ArgumentCount { .. }
            | Self::ArgumentType { .. } => ErrorKind::Type,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::UndefinedVariable { line, .. }
            | Self::UndefinedFunction { line, .. }
            | Self::Redeclaration { line, .. }
            | Self::FunctionRedefinition { line, .. }
            | Self::DeclarationMismatch { line, .. }
            | Self::AssignmentMismatch { line, .. }
            | Self::NonBooleanCondition { line, .. }
            | Self::BinaryOperands { line, .. }
            | Self::UnaryOperand { line, .. }
            | Self::ReturnMismatch { line, .. }
            | Self::NotAnArray { line, .. }
            | Self::NonIntegerIndex { line, .. }
            | Self::MixedArrayElements { line, .. }
            | Self::ArgumentCount { line, .. }
            | Self::ArgumentType { line, .. }
            | Self::ReturnOutsideFunction { line } => *line,
        }
    }
}

pub type SemanticResult<T> = Result<T, SemanticError>;
