pub mod config;
pub mod error;
pub mod matcher;
pub mod query;

pub use config::{CompositeAnchor, MatchOptions};
pub use error::{DslError, EvalError, LexError, ParseError, Result};
pub use matcher::{is_match, is_match_with, match_or_indeterminate, Matcher};
pub use query::{evaluate, parse, tokenize, Expr, MatchOutcome, Token, TokenKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
