//! Entry points tying the lexer, parser and evaluator together
//!
//! ```rust
//! use textmatch::{is_match, Matcher, MatchOptions};
//!
//! assert!(is_match("first name, last name", "first < last").unwrap());
//!
//! let matcher = Matcher::compile("error & ~warning", MatchOptions::default()).unwrap();
//! assert!(matcher.is_match("ERROR: disk full").unwrap());
//! assert!(!matcher.is_match("warning: error budget low").unwrap());
//! ```

use tracing::{debug, trace, warn};

use crate::config::MatchOptions;
use crate::query::{tokenize, Evaluator, Expr, MatchOutcome, Parser};
use crate::Result;

/// Longest text excerpt attached to log events
const SNIPPET_CHARS: usize = 50;

/// A compiled expression, ready to be evaluated against many texts
#[derive(Clone, Debug)]
pub struct Matcher {
    expression: String,
    /// `None` for a blank expression, which matches everything
    root: Option<Expr>,
    evaluator: Evaluator,
}

impl Matcher {
    /// Tokenize and parse `expression` once
    pub fn compile(expression: &str, options: MatchOptions) -> Result<Self> {
        let root = if expression.is_empty() {
            None
        } else {
            let tokens = tokenize(expression)?;
            trace!(count = tokens.len(), "Tokenized expression");
            let root = Parser::new(tokens)
                .with_max_depth(options.max_depth)
                .parse()?;
            debug!(
                expression = %expression,
                tree = %root,
                terms = root.terms().len(),
                "Compiled expression"
            );
            Some(root)
        };

        Ok(Self {
            expression: expression.to_string(),
            root,
            evaluator: Evaluator::new(&options),
        })
    }

    /// Evaluate against `text`, keeping the anchor of the top-level node
    ///
    /// The anchor is a character offset into `text` as given, even when
    /// case folding changes the number of characters.
    pub fn evaluate(&self, text: &str) -> Result<MatchOutcome> {
        let outcome = match &self.root {
            Some(root) => self.evaluator.evaluate(root, text)?,
            None => MatchOutcome::unanchored(true),
        };
        trace!(
            expression = %self.expression,
            matched = outcome.matched,
            anchor = ?outcome.anchor,
            "Evaluated expression"
        );
        Ok(outcome)
    }

    pub fn is_match(&self, text: &str) -> Result<bool> {
        Ok(self.evaluate(text)?.matched)
    }

    /// The source the matcher was compiled from
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn root(&self) -> Option<&Expr> {
        self.root.as_ref()
    }

    pub fn options(&self) -> &MatchOptions {
        self.evaluator.options()
    }
}

/// Check whether `text` satisfies `expression`, ignoring case
pub fn is_match(text: &str, expression: &str) -> Result<bool> {
    is_match_with(text, expression, &MatchOptions::default())
}

/// Check whether `text` satisfies `expression` under `options`
///
/// An empty expression matches every text. Any lexer, parser or evaluation
/// failure is returned unchanged.
pub fn is_match_with(text: &str, expression: &str, options: &MatchOptions) -> Result<bool> {
    Matcher::compile(expression, options.clone())?.is_match(text)
}

/// Like [`is_match_with`], but a failing expression yields `None`
///
/// The failure is logged at `warn` level with the expression and the start of
/// the text.
pub fn match_or_indeterminate(text: &str, expression: &str, options: &MatchOptions) -> Option<bool> {
    match is_match_with(text, expression, options) {
        Ok(matched) => Some(matched),
        Err(err) => {
            warn!(
                expression = %expression,
                text = %snippet(text),
                error = %err,
                "Match expression could not be evaluated"
            );
            None
        }
    }
}

fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DslError, LexError, ParseError};

    #[test]
    fn test_is_match_defaults_to_ignore_case() {
        assert!(is_match("Python", "python").unwrap());
        assert!(is_match("python", "PYTHON").unwrap());
        assert!(!is_match_with("Python", "python", &MatchOptions::case_sensitive()).unwrap());
    }

    #[test]
    fn test_empty_expression_matches() {
        assert!(is_match("anything", "").unwrap());
        assert!(is_match("", "").unwrap());

        let matcher = Matcher::compile("", MatchOptions::default()).unwrap();
        assert!(matcher.root().is_none());
        assert_eq!(matcher.evaluate("x").unwrap(), MatchOutcome::unanchored(true));
    }

    #[test]
    fn test_blank_expression_is_an_error() {
        assert!(matches!(
            is_match("text", "   "),
            Err(DslError::Parse(ParseError::MissingOperand { offset: 3, .. }))
        ));
    }

    #[test]
    fn test_errors_keep_their_stage() {
        assert!(matches!(
            is_match("text", "a\\"),
            Err(DslError::Lex(LexError::TrailingEscape { offset: 1 }))
        ));
        assert!(matches!(
            is_match("text", "A & (B"),
            Err(DslError::Parse(ParseError::UnclosedGroup { .. }))
        ));
    }

    #[test]
    fn test_matcher_reuse() {
        let matcher = Matcher::compile("first < last", MatchOptions::default()).unwrap();
        assert_eq!(matcher.expression(), "first < last");
        assert!(matcher.is_match("first name, last name").unwrap());
        assert!(!matcher.is_match("last name, first name").unwrap());
        assert!(matcher.is_match("FIRST then LAST").unwrap());
        assert_eq!(matcher.evaluate("first last").unwrap(), MatchOutcome::hit(6));
    }

    #[test]
    fn test_matcher_respects_max_depth() {
        let options = MatchOptions::default().with_max_depth(1);
        let matcher = Matcher::compile("(a)", options.clone()).unwrap();
        assert_eq!(matcher.options(), &options);
        assert!(matches!(
            Matcher::compile("((a))", options),
            Err(DslError::Parse(ParseError::NestingTooDeep { limit: 1, .. }))
        ));
    }

    #[test]
    fn test_matcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Matcher>();
    }

    #[test]
    fn test_match_or_indeterminate() {
        let options = MatchOptions::default();
        assert_eq!(match_or_indeterminate("a b", "a & b", &options), Some(true));
        assert_eq!(match_or_indeterminate("a", "a & b", &options), Some(false));
        assert_eq!(match_or_indeterminate("a", "a &", &options), None);
        assert_eq!(match_or_indeterminate("a", "\"a", &options), None);
    }

    #[test]
    fn test_snippet_truncates() {
        assert_eq!(snippet("short"), "short");
        let long = "x".repeat(60);
        assert_eq!(snippet(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(snippet(&"y".repeat(50)), "y".repeat(50));
    }
}
