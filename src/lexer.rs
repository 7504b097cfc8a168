//! Priority-ordered tokenizer.
//!
//! At every position the scanner walks [`RULES`] top to bottom and commits to
//! the first rule that matches. It never looks for the longest match, so the
//! table order is part of the language: keywords sit above identifiers,
//! float literals above integers and two-character operators above their
//! one-character prefixes.

pub mod error;
pub mod token;

use log::debug;

pub use error::{LexError, LexResult};
pub use token::{Span, Token, TokenKind};

#[derive(Debug, Clone, Copy)]
enum Rule {
    Comment,
    Whitespace,
    Keyword(&'static str, TokenKind<'static>),
    StringLiteral,
    FloatLiteral,
    BoolLiteral,
    CharLiteral,
    Number,
    Identifier,
    Symbol(&'static str, TokenKind<'static>),
}

const RULES: &[Rule] = &[
    Rule::Comment,
    Rule::Whitespace,
    Rule::Keyword("if", TokenKind::If),
    Rule::Keyword("else", TokenKind::Else),
    Rule::Keyword("while", TokenKind::While),
    Rule::Keyword("for", TokenKind::For),
    Rule::Keyword("string", TokenKind::String),
    Rule::Keyword("bool", TokenKind::Bool),
    Rule::Keyword("char", TokenKind::Char),
    Rule::Keyword("float", TokenKind::Float),
    Rule::Keyword("int", TokenKind::Int),
    Rule::Keyword("def", TokenKind::Def),
    Rule::Keyword("return", TokenKind::Return),
    Rule::Keyword("print", TokenKind::Print),
    Rule::StringLiteral,
    Rule::FloatLiteral,
    Rule::BoolLiteral,
    Rule::CharLiteral,
    Rule::Number,
    Rule::Identifier,
    Rule::Symbol("==", TokenKind::EqualEqual),
    Rule::Symbol("!=", TokenKind::NotEqual),
    Rule::Symbol(">=", TokenKind::GreaterEqual),
    Rule::Symbol("<=", TokenKind::LessEqual),
    Rule::Symbol(">", TokenKind::Greater),
    Rule::Symbol("<", TokenKind::Less),
    Rule::Symbol("!", TokenKind::Not),
    Rule::Symbol("=", TokenKind::Assign),
    Rule::Symbol("+", TokenKind::Plus),
    Rule::Symbol("-", TokenKind::Minus),
    Rule::Symbol("*", TokenKind::Star),
    Rule::Symbol("/", TokenKind::Slash),
    Rule::Symbol("[", TokenKind::LBracket),
    Rule::Symbol("]", TokenKind::RBracket),
    Rule::Symbol("(", TokenKind::LParen),
    Rule::Symbol(")", TokenKind::RParen),
    Rule::Symbol("{", TokenKind::LBrace),
    Rule::Symbol("}", TokenKind::RBrace),
    Rule::Symbol(";", TokenKind::Semicolon),
    Rule::Symbol(",", TokenKind::Comma),
];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ascii_digits(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}

/// Length of `word` at the start of `rest` when it stands alone as a word.
fn match_word(word: &str, rest: &str, previous: Option<char>) -> Option<usize> {
    if previous.is_some_and(is_word_char) || !rest.starts_with(word) {
        return None;
    }
    match rest[word.len()..].chars().next() {
        Some(next) if is_word_char(next) => None,
        _ => Some(word.len()),
    }
}

impl Rule {
    /// Byte length of the match at the start of `rest`, if this rule applies.
    fn match_len(self, rest: &str, previous: Option<char>) -> Option<usize> {
        match self {
            Rule::Comment => rest
                .starts_with("//")
                .then(|| rest.find('\n').unwrap_or(rest.len())),
            Rule::Whitespace => {
                let len: usize = rest
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .map(char::len_utf8)
                    .sum();
                (len > 0).then_some(len)
            }
            Rule::Keyword(word, _) => match_word(word, rest, previous),
            Rule::StringLiteral => {
                let body = rest.strip_prefix('"')?;
                body.find('"').map(|end| end + 2)
            }
            Rule::FloatLiteral => {
                let whole = ascii_digits(rest);
                if whole == 0 || rest.as_bytes().get(whole) != Some(&b'.') {
                    return None;
                }
                let fraction = ascii_digits(&rest[whole + 1..]);
                (fraction > 0).then_some(whole + 1 + fraction)
            }
            Rule::BoolLiteral => match_word("true", rest, previous)
                .or_else(|| match_word("false", rest, previous)),
            Rule::CharLiteral => {
                let mut chars = rest.chars();
                if chars.next()? != '\'' {
                    return None;
                }
                let value = chars.next()?;
                if value == '\'' || chars.next()? != '\'' {
                    return None;
                }
                Some(2 + value.len_utf8())
            }
            Rule::Number => {
                let len = ascii_digits(rest);
                (len > 0).then_some(len)
            }
            Rule::Identifier => {
                let first = rest.chars().next()?;
                if !(first.is_ascii_alphabetic() || first == '_') {
                    return None;
                }
                Some(
                    rest.bytes()
                        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                        .count(),
                )
            }
            Rule::Symbol(text, _) => rest.starts_with(text).then_some(text.len()),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    eof_reached: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 0,
            eof_reached: false,
        }
    }

    /// Produces the next significant token, skipping whitespace and comments.
    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        loop {
            let span = Span {
                line: self.line,
                column: self.column,
            };
            let rest = &self.input[self.position..];
            if rest.is_empty() {
                self.eof_reached = true;
                return Ok(Token::new(TokenKind::EOF, "", span));
            }

            let previous = self.input[..self.position].chars().next_back();
            let Some((rule, len)) = RULES
                .iter()
                .find_map(|rule| rule.match_len(rest, previous).map(|len| (*rule, len)))
            else {
                let character = rest.chars().next().unwrap_or_default();
                return Err(LexError::UnexpectedCharacter {
                    character,
                    line: span.line,
                    column: span.column,
                });
            };

            let lexeme = &rest[..len];
            self.advance(lexeme);

            let kind = match rule {
                Rule::Comment | Rule::Whitespace => continue,
                Rule::Keyword(_, kind) | Rule::Symbol(_, kind) => kind,
                Rule::StringLiteral => TokenKind::StringLiteral(&lexeme[1..lexeme.len() - 1]),
                // `digits.digits` always parses; out-of-range values round to infinity.
                Rule::FloatLiteral => {
                    TokenKind::FloatLiteral(lexeme.parse().unwrap_or_default())
                }
                Rule::BoolLiteral => TokenKind::BoolLiteral(lexeme == "true"),
                Rule::CharLiteral => {
                    TokenKind::CharLiteral(lexeme.chars().nth(1).unwrap_or_default())
                }
                Rule::Number => {
                    let value =
                        lexeme
                            .parse::<i64>()
                            .map_err(|_| LexError::InvalidIntegerLiteral {
                                literal: lexeme.to_string(),
                                line: span.line,
                                column: span.column,
                            })?;
                    TokenKind::Number(value)
                }
                Rule::Identifier => TokenKind::Identifier(lexeme),
            };
            return Ok(Token::new(kind, lexeme, span));
        }
    }

    fn advance(&mut self, lexeme: &str) {
        self.position += lexeme.len();
        for c in lexeme.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        let result = self.next_token();
        if result.is_err() {
            self.eof_reached = true;
        }
        Some(result)
    }
}

/// Tokenizes the whole input, ending with a single `EOF` token.
pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let tokens = Lexer::new(input).collect::<LexResult<Vec<_>>>()?;
    debug!("tokenized {} bytes into {} tokens", input.len(), tokens.len());
    Ok(tokens)
}
