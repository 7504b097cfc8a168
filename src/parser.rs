//! Recursive-descent parser with explicit token lookahead.
//!
//! Expression precedence, lowest to highest:
//! equality (`== !=`), comparison (`< > <= >=`), term (`+ -`),
//! factor (`* /`), unary (`! -`), primary.

pub mod error;

use log::{debug, warn};

use crate::ast::{
    AssignTarget, Assignment, BinaryOperator, Block, Expr, ExprKind, FunctionDef, Param,
    PrimitiveType, Program, Stmt, TypeAnnotation, UnaryOperator,
};
use crate::lexer::{Span, Token, TokenKind};

pub use error::{ParseResult, SyntaxError};

pub const DEFAULT_MAX_NESTING: usize = 256;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::EOF) {
            let span = tokens.last().map(|token| token.span).unwrap_or(Span {
                line: 1,
                column: 0,
            });
            tokens.push(Token::new(TokenKind::EOF, "", span));
        }
        Self {
            tokens,
            position: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_NESTING,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while self.current().kind != TokenKind::EOF {
            statements.push(self.parse_statement()?);
        }
        debug!("parsed {} top-level statements", statements.len());
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let (kind, line) = (self.current().kind, self.current().line());
        match kind {
            kind if kind.is_type_keyword() => self.parse_var_decl(),
            TokenKind::Def => self.parse_function_def(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Identifier(_) => match self.peek(1).kind {
                TokenKind::Assign | TokenKind::LBracket => {
                    Ok(Stmt::Assign(self.parse_assignment(true)?))
                }
                TokenKind::LParen => {
                    let call = self.parse_call()?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Stmt::Expr(call))
                }
                _ => Err(SyntaxError::UnexpectedStatement {
                    found: kind.describe(),
                    line,
                }),
            },
            other => Err(SyntaxError::UnexpectedStatement {
                found: other.describe(),
                line,
            }),
        }
    }

    fn parse_type(&mut self) -> ParseResult<TypeAnnotation> {
        let token = self.current();
        let base = match token.kind {
            TokenKind::Int => PrimitiveType::Int,
            TokenKind::Float => PrimitiveType::Float,
            TokenKind::Bool => PrimitiveType::Bool,
            TokenKind::Char => PrimitiveType::Char,
            TokenKind::String => PrimitiveType::String,
            other => {
                return Err(SyntaxError::UnexpectedToken {
                    expected: "type",
                    found: other.describe(),
                    line: token.line(),
                });
            }
        };
        self.advance();
        if self.current().kind == TokenKind::LBracket {
            self.advance();
            self.expect(TokenKind::RBracket)?;
            return Ok(TypeAnnotation::Array(base));
        }
        Ok(TypeAnnotation::Primitive(base))
    }

    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let line = self.current().line();
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign)?;
        let init = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::VarDecl {
            ty,
            name,
            init,
            line,
        })
    }

    /// `x = e` or `x[i] = e`; the `for` update clause has no trailing `;`.
    fn parse_assignment(&mut self, terminated: bool) -> ParseResult<Assignment> {
        let line = self.current().line();
        let name = self.expect_identifier()?;
        let target = if self.current().kind == TokenKind::LBracket {
            self.advance();
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket)?;
            AssignTarget::Index { name, index }
        } else {
            AssignTarget::Variable(name)
        };
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;
        if terminated {
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(Assignment {
            target,
            value,
            line,
        })
    }

    fn parse_print(&mut self) -> ParseResult<Stmt> {
        let line = self.expect(TokenKind::Print)?.line();
        self.expect(TokenKind::LParen)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Print { value, line })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let line = self.expect(TokenKind::Return)?.line();
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Return { value, line })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let line = self.expect(TokenKind::If)?.line();
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.current().kind == TokenKind::Else {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
            line,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let line = self.expect(TokenKind::While)?.line();
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            condition,
            body,
            line,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let line = self.expect(TokenKind::For)?.line();
        self.expect(TokenKind::LParen)?;
        let init = if self.current().kind.is_type_keyword() {
            self.parse_var_decl()?
        } else {
            Stmt::Assign(self.parse_assignment(true)?)
        };
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        let update = self.parse_assignment(false)?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            init: Box::new(init),
            condition,
            update,
            body,
            line,
        })
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.nested(|parser| {
            let line = parser.expect(TokenKind::LBrace)?.line();
            let mut statements = Vec::new();
            while !matches!(parser.current().kind, TokenKind::RBrace | TokenKind::EOF) {
                statements.push(parser.parse_statement()?);
            }
            parser.expect(TokenKind::RBrace)?;
            Ok(Block { statements, line })
        })
    }

    fn parse_function_def(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::Def)?;
        let return_type = self.parse_type()?;
        let line = self.current().line();
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.current().kind != TokenKind::RParen {
            params.push(self.parse_param()?);
            while self.current().kind == TokenKind::Comma {
                self.advance();
                params.push(self.parse_param()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::FuncDef(FunctionDef {
            return_type,
            name,
            params,
            body,
            line,
        }))
    }

    fn parse_param(&mut self) -> ParseResult<Param> {
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        Ok(Param { ty, name })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_equality)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(Self::parse_comparison, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOperator::Equal),
            TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(Self::parse_term, |kind| match kind {
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(Self::parse_factor, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Sub),
            _ => None,
        })
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Mul),
            TokenKind::Slash => Some(BinaryOperator::Div),
            _ => None,
        })
    }

    /// One left-associative precedence level.
    ///
    /// Each operator deepens the left spine by one node, so the chain is
    /// charged against the nesting budget one level per operator.
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Expr>,
        operator: fn(&TokenKind<'_>) -> Option<BinaryOperator>,
    ) -> ParseResult<Expr> {
        let depth = self.depth;
        let result = self.parse_binary_chain(operand, operator);
        self.depth = depth;
        result
    }

    fn parse_binary_chain(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Expr>,
        operator: fn(&TokenKind<'_>) -> Option<BinaryOperator>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;
        while let Some(op) = operator(&self.current().kind) {
            self.descend()?;
            let line = self.advance().line();
            let right = operand(self)?;
            expr = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Not => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Negate,
            _ => return self.parse_primary(),
        };
        let line = self.advance().line();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
        ))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        let line = token.line();
        let kind = match token.kind {
            TokenKind::Number(value) => ExprKind::Int(value),
            TokenKind::FloatLiteral(value) => ExprKind::Float(value),
            TokenKind::StringLiteral(value) => ExprKind::Str(value.to_string()),
            TokenKind::CharLiteral(value) => ExprKind::Char(value),
            TokenKind::BoolLiteral(value) => ExprKind::Bool(value),
            TokenKind::Identifier(name) => {
                return match self.peek(1).kind {
                    TokenKind::LParen => self.parse_call(),
                    TokenKind::LBracket => self.parse_array_access(),
                    _ => {
                        self.advance();
                        Ok(Expr::new(ExprKind::Var(name.to_string()), line))
                    }
                };
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(expr);
            }
            TokenKind::LBrace => return self.parse_array_literal(),
            other => {
                return Err(SyntaxError::UnexpectedExpression {
                    found: other.describe(),
                    line,
                });
            }
        };
        self.advance();
        Ok(Expr::new(kind, line))
    }

    fn parse_call(&mut self) -> ParseResult<Expr> {
        let line = self.current().line();
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let args = self.parse_expression_list(TokenKind::RParen)?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::new(ExprKind::Call { name, args }, line))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let line = self.expect(TokenKind::LBrace)?.line();
        let elements = self.parse_expression_list(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::ArrayLiteral(elements), line))
    }

    fn parse_array_access(&mut self) -> ParseResult<Expr> {
        let line = self.current().line();
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBracket)?;
        let index = self.parse_expression()?;
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::new(
            ExprKind::ArrayAccess {
                name,
                index: Box::new(index),
            },
            line,
        ))
    }

    /// Comma-separated expressions up to (not including) `close`.
    fn parse_expression_list(&mut self, close: TokenKind<'static>) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.current().kind == close {
            return Ok(items);
        }
        items.push(self.parse_expression()?);
        while self.current().kind == TokenKind::Comma {
            self.advance();
            items.push(self.parse_expression()?);
        }
        Ok(items)
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            warn!("parser nesting limit of {} reached", self.max_depth);
            return Err(SyntaxError::NestingTooDeep {
                limit: self.max_depth,
                line: self.current().line(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn expect(&mut self, expected: TokenKind<'static>) -> ParseResult<Token<'a>> {
        let token = self.current();
        if token.kind.same_kind(&expected) {
            Ok(self.advance())
        } else {
            Err(SyntaxError::UnexpectedToken {
                expected: expected.describe(),
                found: token.kind.describe(),
                line: token.line(),
            })
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        let token = self.current();
        if let TokenKind::Identifier(name) = token.kind {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(SyntaxError::UnexpectedToken {
                expected: "identifier",
                found: token.kind.describe(),
                line: token.line(),
            })
        }
    }

    fn current(&self) -> &Token<'a> {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + offset).min(last)]
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}
