use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    Number(i64),
    FloatLiteral(f64),
    StringLiteral(&'a str),
    CharLiteral(char),
    BoolLiteral(bool),

    // Keywords
    If,
    Else,
    While,
    For,
    Def,
    Return,
    Print,
    Int,
    Float,
    Bool,
    Char,
    String,

    // Operators
    EqualEqual,   // ==
    NotEqual,     // !=
    GreaterEqual, // >=
    LessEqual,    // <=
    Greater,      // >
    Less,         // <
    Not,          // !
    Assign,       // =
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /

    // Delimiters
    LBracket,  // [
    RBracket,  // ]
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Semicolon, // ;
    Comma,     // ,

    EOF,
}

impl TokenKind<'_> {
    /// True for the keywords that name a primitive type.
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::Float | Self::Bool | Self::Char | Self::String
        )
    }

    /// Compares variants while ignoring any literal payload.
    pub fn same_kind(&self, other: &TokenKind<'_>) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Short name used in diagnostics, independent of the payload.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Identifier(_) => "identifier",
            Self::Number(_) => "number",
            Self::FloatLiteral(_) => "float literal",
            Self::StringLiteral(_) => "string literal",
            Self::CharLiteral(_) => "char literal",
            Self::BoolLiteral(_) => "bool literal",
            Self::If => "'if'",
            Self::Else => "'else'",
            Self::While => "'while'",
            Self::For => "'for'",
            Self::Def => "'def'",
            Self::Return => "'return'",
            Self::Print => "'print'",
            Self::Int => "'int'",
            Self::Float => "'float'",
            Self::Bool => "'bool'",
            Self::Char => "'char'",
            Self::String => "'string'",
            Self::EqualEqual => "'=='",
            Self::NotEqual => "'!='",
            Self::GreaterEqual => "'>='",
            Self::LessEqual => "'<='",
            Self::Greater => "'>'",
            Self::Less => "'<'",
            Self::Not => "'!'",
            Self::Assign => "'='",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Semicolon => "';'",
            Self::Comma => "','",
            Self::EOF => "end of input",
        }
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub lexeme: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, lexeme: &'a str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }
}
