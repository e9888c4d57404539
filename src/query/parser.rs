//! Recursive descent parser for match expressions
//!
//! # Grammar
//!
//! ```text
//! expression  := or_expr
//! or_expr     := and_expr ('|' and_expr)*
//! and_expr    := before_expr ('&' before_expr)*
//! before_expr := not_expr ('<' not_expr)*
//! not_expr    := '~' not_expr | primary
//! primary     := WORD | QUOTED | '(' or_expr ')'
//! ```
//!
//! Every repetition folds to the left, so `a < b < c` becomes
//! `(a < b) < c`. Groups and negations are the only recursive productions;
//! their nesting is bounded by `max_depth`.

use tracing::trace;

use super::ast::Expr;
use super::lexer::{Token, TokenKind};
use crate::config::{DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
use crate::error::ParseError;
use crate::Result;

const EXPECTED_OPERAND: &str = "a word, quoted string, '~' or '('";

/// Parser for match expressions
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Returned once the token stream runs out
    end: Token,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Create a parser over a token stream produced by the lexer
    ///
    /// The stream does not need to end with an `End` token; one is implied
    /// after the last token.
    pub fn new(tokens: Vec<Token>) -> Self {
        let end_offset = tokens.last().map(Token::end).unwrap_or(0);
        Self {
            tokens,
            position: 0,
            end: Token::new(TokenKind::End, "", end_offset, 0),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum nesting of groups and negations
    ///
    /// Values above [`MAX_DEPTH_LIMIT`] are capped.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_DEPTH_LIMIT);
        self
    }

    /// Parse the token stream into an expression tree
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or_expr()?;

        // Ensure we've consumed all input
        let token = self.current();
        if token.kind != TokenKind::End {
            return Err(ParseError::TrailingInput {
                offset: token.start,
                found: token.kind,
            });
        }

        trace!(node = expr.node_type(), depth = expr.depth(), "Parsed expression");
        Ok(expr)
    }

    /// Parse: or_expr := and_expr ('|' and_expr)*
    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_and_expr()?;

        while self.current().kind == TokenKind::Or {
            self.advance();
            node = Expr::or(node, self.parse_and_expr()?);
        }

        Ok(node)
    }

    /// Parse: and_expr := before_expr ('&' before_expr)*
    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_before_expr()?;

        while self.current().kind == TokenKind::And {
            self.advance();
            node = Expr::and(node, self.parse_before_expr()?);
        }

        Ok(node)
    }

    /// Parse: before_expr := not_expr ('<' not_expr)*
    fn parse_before_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_not_expr()?;

        while self.current().kind == TokenKind::Before {
            self.advance();
            node = Expr::before(node, self.parse_not_expr()?);
        }

        Ok(node)
    }

    /// Parse: not_expr := '~' not_expr | primary
    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.current().kind != TokenKind::Not {
            return self.parse_primary();
        }

        let offset = self.current().start;
        self.advance();
        self.descend(offset)?;
        let operand = self.parse_not_expr();
        self.depth -= 1;

        Ok(Expr::not(operand?))
    }

    /// Parse: primary := WORD | QUOTED | '(' or_expr ')'
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Word | TokenKind::QuotedString => {
                self.advance();
                Ok(Expr::Literal {
                    text: token.lexeme,
                    quoted: token.kind == TokenKind::QuotedString,
                })
            }
            TokenKind::LParen => {
                self.advance(); // consume '('
                self.descend(token.start)?;
                let inner = self.parse_or_expr();
                self.depth -= 1;
                let inner = inner?;
                self.expect_close(token.start)?;
                Ok(inner)
            }
            TokenKind::RParen => Err(ParseError::UnexpectedToken {
                offset: token.start,
                expected: EXPECTED_OPERAND,
                found: token.kind,
            }),
            TokenKind::And
            | TokenKind::Or
            | TokenKind::Not
            | TokenKind::Before
            | TokenKind::End => Err(ParseError::MissingOperand {
                offset: token.start,
                expected: EXPECTED_OPERAND,
                found: token.kind,
            }),
        }
    }

    /// Expect the ')' closing the group opened at `open` and advance
    fn expect_close(&mut self, open: usize) -> Result<(), ParseError> {
        let token = self.current();
        if token.kind == TokenKind::RParen {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnclosedGroup {
                offset: token.start,
                open,
                found: token.kind,
            })
        }
    }

    /// Enter a group or negation, failing once nesting exceeds the limit
    fn descend(&mut self, offset: usize) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::NestingTooDeep {
                offset,
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.end)
    }

    /// Advance to the next token
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Parse a token stream into an expression tree with the default depth limit
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}
