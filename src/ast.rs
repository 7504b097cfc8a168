//! Syntax tree produced by the parser.
//!
//! The parser builds these nodes once; the analyzer and the interpreter only
//! borrow them. Every statement and expression carries the source line it
//! started on so later stages can cite it in diagnostics.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    Float,
    Bool,
    Char,
    String,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::String => "string",
        })
    }
}

/// A type as written in source: `int` or `int[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAnnotation {
    Primitive(PrimitiveType),
    Array(PrimitiveType),
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(base) => write!(f, "{base}"),
            Self::Array(base) => write!(f, "{base}[]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Less | Self::Greater | Self::LessEqual | Self::GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Not => "!",
            Self::Negate => "-",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Var(String),
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    ArrayAccess {
        name: String,
        index: Box<Expr>,
    },
}

/// Assignment target forms accepted by the parser: `x` or `x[i]`.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Variable(String),
    Index { name: String, index: Expr },
}

impl AssignTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Variable(name) | Self::Index { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: AssignTarget,
    pub value: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeAnnotation,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub return_type: TypeAnnotation,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        ty: TypeAnnotation,
        name: String,
        init: Expr,
        line: usize,
    },
    Assign(Assignment),
    Print {
        value: Expr,
        line: usize,
    },
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
        line: usize,
    },
    While {
        condition: Expr,
        body: Block,
        line: usize,
    },
    /// `init` is always a `VarDecl` or an `Assign`.
    For {
        init: Box<Stmt>,
        condition: Expr,
        update: Assignment,
        body: Block,
        line: usize,
    },
    FuncDef(FunctionDef),
    Return {
        value: Expr,
        line: usize,
    },
    Expr(Expr),
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Self::VarDecl { line, .. }
            | Self::Print { line, .. }
            | Self::If { line, .. }
            | Self::While { line, .. }
            | Self::For { line, .. }
            | Self::Return { line, .. } => *line,
            Self::Assign(assignment) => assignment.line,
            Self::FuncDef(function) => function.line,
            Self::Expr(expr) => expr.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
