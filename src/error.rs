use thiserror::Error;

use crate::query::lexer::TokenKind;

/// Number of query characters shown on each side of the caret in
/// [`DslError::context`].
const CONTEXT_WINDOW: usize = 10;

/// Errors raised while tokenizing a match expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated quoted string (expected {quote}) starting at position {offset}")]
    UnterminatedString { offset: usize, quote: char },

    #[error("Unexpected end of input after backslash at position {offset}")]
    TrailingEscape { offset: usize },

    #[error("Unexpected character {found:?} at position {offset}")]
    UnexpectedCharacter { offset: usize, found: char },
}

impl LexError {
    /// Character offset in the query where the problem was detected
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedString { offset, .. }
            | LexError::TrailingEscape { offset }
            | LexError::UnexpectedCharacter { offset, .. } => *offset,
        }
    }
}

/// Errors raised while building the expression tree from tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing operand at position {offset}: expected {expected}, got {found}")]
    MissingOperand {
        offset: usize,
        expected: &'static str,
        found: TokenKind,
    },

    #[error("Unclosed group opened at position {open}: expected ')', got {found} at position {offset}")]
    UnclosedGroup {
        offset: usize,
        open: usize,
        found: TokenKind,
    },

    #[error("Unexpected {found} after end of expression at position {offset}")]
    TrailingInput { offset: usize, found: TokenKind },

    #[error("Unexpected token at position {offset}: expected {expected}, got {found}")]
    UnexpectedToken {
        offset: usize,
        expected: &'static str,
        found: TokenKind,
    },

    #[error("Expression nested deeper than {limit} levels at position {offset}")]
    NestingTooDeep { offset: usize, limit: usize },
}

impl ParseError {
    /// Character offset in the query of the offending token
    pub fn offset(&self) -> usize {
        match self {
            ParseError::MissingOperand { offset, .. }
            | ParseError::UnclosedGroup { offset, .. }
            | ParseError::TrailingInput { offset, .. }
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::NestingTooDeep { offset, .. } => *offset,
        }
    }

    /// What the parser was looking for when it failed
    pub fn expected(&self) -> &'static str {
        match self {
            ParseError::MissingOperand { expected, .. }
            | ParseError::UnexpectedToken { expected, .. } => *expected,
            ParseError::UnclosedGroup { .. } => "')'",
            ParseError::TrailingInput { .. } => "end of input",
            ParseError::NestingTooDeep { .. } => "a shallower expression",
        }
    }

    /// The token kind found instead, if the failure was about a token
    pub fn found(&self) -> Option<TokenKind> {
        match self {
            ParseError::MissingOperand { found, .. }
            | ParseError::UnclosedGroup { found, .. }
            | ParseError::TrailingInput { found, .. }
            | ParseError::UnexpectedToken { found, .. } => Some(*found),
            ParseError::NestingTooDeep { .. } => None,
        }
    }
}

/// Faults raised while walking an expression tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Malformed node: {0}")]
    MalformedNode(String),
}

/// Main error type for match expressions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// Result type alias for match operations
pub type Result<T, E = DslError> = std::result::Result<T, E>;

impl DslError {
    /// Character offset in the query string, when the error has one
    pub fn offset(&self) -> Option<usize> {
        match self {
            DslError::Lex(err) => Some(err.offset()),
            DslError::Parse(err) => Some(err.offset()),
            DslError::Eval(_) => None,
        }
    }

    /// Check if this error comes from a malformed query rather than evaluation
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, DslError::Lex(_) | DslError::Parse(_))
    }

    /// Render the part of `query` around the error with a caret under it
    ///
    /// ```text
    /// abc "unterminated xyz
    ///     ^
    /// ```
    pub fn context(&self, query: &str) -> Option<String> {
        let position = self.offset()?;
        let chars: Vec<char> = query.chars().collect();
        let position = position.min(chars.len());
        let start = position.saturating_sub(CONTEXT_WINDOW);
        let end = (position + CONTEXT_WINDOW).min(chars.len());

        let window: String = chars[start..end].iter().collect();
        let pointer = " ".repeat(position - start);
        Some(format!("{}\n{}^", window, pointer))
    }
}
