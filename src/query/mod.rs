//! Match expression language
//!
//! Expressions combine search terms with four operators:
//!
//! | Operator | Meaning                              | Precedence |
//! |----------|--------------------------------------|------------|
//! | `~a`     | `a` does not occur                   | highest    |
//! | `a < b`  | `b` occurs after `a`                 |            |
//! | `a & b`  | both occur                           |            |
//! | `a \| b` | either occurs                        | lowest     |
//!
//! Terms are bare words or quoted strings; a backslash escapes the next
//! character in both. Parentheses group.
//!
//! # Example
//!
//! ```rust
//! use textmatch::query::{parse_expression, Expr};
//!
//! let expr = parse_expression("python & ~java").unwrap();
//! assert_eq!(expr, Expr::and(Expr::word("python"), Expr::not(Expr::word("java"))));
//! ```

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use ast::Expr;
pub use evaluator::{evaluate, Evaluator, MatchOutcome, MAX_EVAL_DEPTH};
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, Parser};

use crate::Result;

/// Tokenize and parse `input` with the default nesting limit
pub fn parse_expression(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    Ok(parse(tokens)?)
}
