//! Evaluation of expression trees against a target text
//!
//! Every node yields a [`MatchOutcome`]: whether it matched and, for nodes
//! that matched on an actual occurrence, the character offset of that
//! occurrence (its anchor). `a < b` looks for `b` strictly after the anchor
//! of `a`, and itself anchors on the `b` it found, which is what makes
//! `a < b < c` require `c` after `b` rather than merely after `a`.
//!
//! The parser folds chains such as `a | b | c` to the left, so a long query
//! yields a tree as tall as the chain. The evaluator walks the left spine of
//! such trees iteratively and only recurses into right operands and
//! negations.

use serde::Serialize;
use std::borrow::Cow;

use super::ast::Expr;
use crate::config::{MatchOptions, MAX_DEPTH_LIMIT};
use crate::error::EvalError;
use crate::Result;

/// Deepest recursion the evaluator accepts
///
/// Left-folded chains are walked in a loop and do not count. Recursion
/// happens for negated operands and right operands only; the parser cannot
/// produce more than four of those per nesting level.
pub const MAX_EVAL_DEPTH: usize = 4 * (MAX_DEPTH_LIMIT + 1);

/// Result of evaluating one node
///
/// `anchor` is a character offset into the target text. It is only present
/// when `matched` is true.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub matched: bool,
    pub anchor: Option<usize>,
}

impl MatchOutcome {
    /// A match on an occurrence at `anchor`
    pub fn hit(anchor: usize) -> Self {
        Self {
            matched: true,
            anchor: Some(anchor),
        }
    }

    pub fn miss() -> Self {
        Self {
            matched: false,
            anchor: None,
        }
    }

    /// A verdict with no occurrence to point at
    pub fn unanchored(matched: bool) -> Self {
        Self {
            matched,
            anchor: None,
        }
    }

    /// Shift the anchor by `offset` characters
    fn shifted(self, offset: usize) -> Self {
        Self {
            matched: self.matched,
            anchor: self.anchor.map(|anchor| anchor + offset),
        }
    }
}

/// A binary node on the left spine of a chain, waiting for its right operand
#[derive(Clone, Copy)]
enum Pending<'a> {
    And(&'a Expr),
    Or(&'a Expr),
    Before(&'a Expr),
}

/// Walks expression trees against target texts
///
/// Holds no per-call state, so one evaluator can be reused for any number
/// of texts and trees.
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    options: MatchOptions,
}

impl Evaluator {
    pub fn new(options: &MatchOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Evaluate `expr` against `text`
    ///
    /// Matching runs on the case-folded text; the returned anchor is
    /// translated back to a character offset in `text`.
    pub fn evaluate(&self, expr: &Expr, text: &str) -> Result<MatchOutcome, EvalError> {
        let folded = self.options.fold(text);
        let outcome = self.visit(expr, &folded, 1)?;

        match (&folded, outcome.anchor) {
            (Cow::Owned(_), Some(anchor)) => Ok(MatchOutcome::hit(source_offset(text, anchor))),
            _ => Ok(outcome),
        }
    }

    /// `text` is already folded; terms are folded as they are visited
    fn visit(&self, expr: &Expr, text: &str, depth: usize) -> Result<MatchOutcome, EvalError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(EvalError::MalformedNode(format!(
                "{} node nested deeper than {} levels",
                expr.node_type(),
                MAX_EVAL_DEPTH
            )));
        }

        // Descend the left spine, remembering each right operand
        let mut spine = Vec::new();
        let mut node = expr;
        let mut outcome = loop {
            match node {
                Expr::Literal { text: term, .. } => break self.find(term, text),
                Expr::Not { operand } => {
                    let inner = self.visit(operand, text, depth + 1)?;
                    break MatchOutcome::unanchored(!inner.matched);
                }
                Expr::And { left, right } => {
                    spine.push(Pending::And(right));
                    node = left.as_ref();
                }
                Expr::Or { left, right } => {
                    spine.push(Pending::Or(right));
                    node = left.as_ref();
                }
                Expr::Before { left, right } => {
                    spine.push(Pending::Before(right));
                    node = left.as_ref();
                }
            }
        };

        // Fold back up, innermost node first
        while let Some(pending) = spine.pop() {
            outcome = match pending {
                Pending::And(right) => self.and(outcome, right, text, depth)?,
                Pending::Or(right) => self.or(outcome, right, text, depth)?,
                Pending::Before(right) => self.before(outcome, right, text, depth)?,
            };
        }

        Ok(outcome)
    }

    fn and(
        &self,
        left: MatchOutcome,
        right: &Expr,
        text: &str,
        depth: usize,
    ) -> Result<MatchOutcome, EvalError> {
        if !left.matched {
            return Ok(MatchOutcome::miss());
        }
        let right = self.visit(right, text, depth + 1)?;
        if !right.matched {
            return Ok(MatchOutcome::miss());
        }
        Ok(MatchOutcome {
            matched: true,
            anchor: self.options.composite_anchor.pick(left.anchor, right.anchor),
        })
    }

    fn or(
        &self,
        left: MatchOutcome,
        right: &Expr,
        text: &str,
        depth: usize,
    ) -> Result<MatchOutcome, EvalError> {
        let right = self.visit(right, text, depth + 1)?;
        let anchor = match (left.matched, right.matched) {
            (true, true) => self.options.composite_anchor.pick(left.anchor, right.anchor),
            (true, false) => left.anchor,
            (false, true) => right.anchor,
            (false, false) => return Ok(MatchOutcome::miss()),
        };
        Ok(MatchOutcome {
            matched: true,
            anchor,
        })
    }

    fn before(
        &self,
        left: MatchOutcome,
        right: &Expr,
        text: &str,
        depth: usize,
    ) -> Result<MatchOutcome, EvalError> {
        // A negated left side matches without an occurrence and cannot
        // order anything
        let Some(anchor) = left.anchor.filter(|_| left.matched) else {
            return Ok(MatchOutcome::miss());
        };

        // Search strictly after the left anchor
        let Some((start, _)) = text.char_indices().nth(anchor + 1) else {
            return Ok(MatchOutcome::miss());
        };
        let right = self
            .visit(right, &text[start..], depth + 1)?
            .shifted(anchor + 1);

        match right.anchor.filter(|_| right.matched) {
            Some(found) => Ok(MatchOutcome::hit(found)),
            None => Ok(MatchOutcome::miss()),
        }
    }

    /// First occurrence of `term` in the folded `text`
    fn find(&self, term: &str, text: &str) -> MatchOutcome {
        match text.find(self.options.fold(term).as_ref()) {
            Some(byte) => MatchOutcome::hit(text[..byte].chars().count()),
            None => MatchOutcome::miss(),
        }
    }
}

/// Map a character offset in the lowercased `text` back to `text`
///
/// Lowercasing may turn one character into several (`İ` becomes `i̇`), and
/// each character folds to the same number of characters wherever it sits.
fn source_offset(text: &str, folded: usize) -> usize {
    let mut seen = 0;
    for (index, ch) in text.chars().enumerate() {
        seen += ch.to_lowercase().count();
        if seen > folded {
            return index;
        }
    }
    text.chars().count()
}

/// Evaluate `expr` against `text` with the given options
pub fn evaluate(expr: &Expr, text: &str, options: &MatchOptions) -> Result<MatchOutcome, EvalError> {
    Evaluator::new(options).evaluate(expr, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompositeAnchor;

    fn w(text: &str) -> Expr {
        Expr::word(text)
    }

    fn eval(expr: &Expr, text: &str) -> MatchOutcome {
        Evaluator::default().evaluate(expr, text).unwrap()
    }

    fn matches(expr: &Expr, text: &str) -> bool {
        eval(expr, text).matched
    }

    #[test]
    fn test_literal_match() {
        let node = w("python");
        assert_eq!(eval(&node, "I love python programming"), MatchOutcome::hit(7));
        assert_eq!(eval(&node, "I love java"), MatchOutcome::miss());
    }

    #[test]
    fn test_case_insensitivity() {
        let node = w("Python");
        assert!(matches(&node, "coding in python"));
        assert!(matches(&node, "CODING IN PYTHON"));

        let exact = Evaluator::new(&MatchOptions::case_sensitive());
        assert!(!exact.evaluate(&node, "coding in python").unwrap().matched);
        assert!(exact.evaluate(&node, "coding in Python").unwrap().matched);
    }

    #[test]
    fn test_quoted_string() {
        let node = Expr::quoted("data science");
        assert!(matches(&node, "Expert in data science"));
        assert!(!matches(&node, "Expert in data and science"));
    }

    #[test]
    fn test_and_logic() {
        let node = Expr::and(w("fast"), w("furious"));
        assert_eq!(eval(&node, "fast and furious"), MatchOutcome::hit(0));
        assert!(!matches(&node, "fast but slow"));
        assert!(!matches(&node, "calm and furious"));
    }

    #[test]
    fn test_or_logic() {
        let node = Expr::or(w("cat"), w("dog"));
        assert_eq!(eval(&node, "I have a cat"), MatchOutcome::hit(9));
        assert_eq!(eval(&node, "I have a dog"), MatchOutcome::hit(9));
        assert_eq!(eval(&node, "dog and cat"), MatchOutcome::hit(0));
        assert!(!matches(&node, "I have a hamster"));
    }

    #[test]
    fn test_not_logic() {
        let node = Expr::not(w("java"));
        assert_eq!(eval(&node, "python code"), MatchOutcome::unanchored(true));
        assert_eq!(eval(&node, "java code"), MatchOutcome::unanchored(false));
    }

    #[test]
    fn test_before_basic() {
        let node = Expr::before(w("first"), w("last"));
        assert_eq!(eval(&node, "first name then last name"), MatchOutcome::hit(16));
        assert!(!matches(&node, "last name then first name"));
        assert!(!matches(&node, "only first name"));
    }

    #[test]
    fn test_before_strict_sequence() {
        let node = Expr::before(w("a"), w("b"));
        // first "a" at 2, a "b" follows at 4
        assert!(matches(&node, "b a b"));
        assert!(!matches(&node, "b a"));
    }

    #[test]
    fn test_before_starts_strictly_after_anchor() {
        // "aa" at 0, next "a" search starts at 1
        assert!(matches(&Expr::before(w("aa"), w("a")), "aa"));
        assert!(!matches(&Expr::before(w("a"), w("a")), "a"));
        assert!(!matches(&Expr::before(w("ab"), w("ab")), "ab"));
    }

    #[test]
    fn test_before_chain_anchors_on_previous_term() {
        let node = Expr::before(Expr::before(w("a"), w("b")), w("c"));
        assert!(matches(&node, "a then b then c"));
        assert!(!matches(&node, "a then c then b"));
        assert_eq!(eval(&node, "A B C"), MatchOutcome::hit(4));
        assert!(!matches(&node, "A C B"));
    }

    #[test]
    fn test_before_right_group() {
        let node = Expr::before(w("x"), Expr::or(w("y"), w("z")));
        assert_eq!(eval(&node, "z x y"), MatchOutcome::hit(4));
        assert!(!matches(&node, "y z x"));
    }

    #[test]
    fn test_before_with_or_left() {
        let node = Expr::before(Expr::or(w("start"), w("begin")), w("end"));
        for (text, expected) in [
            ("start the process and end it", true),
            ("begin the process and end it", true),
            ("end the process before you start", false),
            ("completely irrelevant text", false),
        ] {
            assert_eq!(matches(&node, text), expected, "{}", text);
        }
    }

    #[test]
    fn test_composite_anchor_policy() {
        // "a" at 0, "b" at 4, "x" at 2
        let node = Expr::before(Expr::and(w("a"), w("b")), w("x"));
        let text = "a x b";
        assert!(matches(&node, text));

        let latest = Evaluator::new(
            &MatchOptions::default().with_composite_anchor(CompositeAnchor::Latest),
        );
        assert!(!latest.evaluate(&node, text).unwrap().matched);
        assert!(latest.evaluate(&node, "a x b x").unwrap().matched);
    }

    #[test]
    fn test_not_cannot_anchor_before() {
        assert!(!matches(&Expr::before(Expr::not(w("draft")), w("submit")), "submit"));
        assert!(!matches(&Expr::before(w("submit"), Expr::not(w("draft"))), "submit now"));
    }

    #[test]
    fn test_and_with_negated_side_keeps_anchor() {
        let node = Expr::and(Expr::not(w("draft")), w("final"));
        assert_eq!(eval(&node, "the final copy"), MatchOutcome::hit(4));
        assert!(matches(&Expr::before(node, w("copy")), "the final copy"));
    }

    #[test]
    fn test_before_at_end_of_text() {
        assert!(!matches(&Expr::before(w("d"), Expr::quoted("")), "the end"));
        assert!(matches(&Expr::before(w("the"), Expr::quoted("")), "the end"));
    }

    #[test]
    fn test_empty_text() {
        assert!(!matches(&w("something"), ""));
        assert!(matches(&Expr::not(w("something")), ""));
    }

    #[test]
    fn test_anchor_counts_characters() {
        let node = Expr::before(w("é"), w("x"));
        assert_eq!(eval(&node, "ééé x"), MatchOutcome::hit(4));
        assert_eq!(eval(&w("x"), "日本 x"), MatchOutcome::hit(3));
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let node = Expr::before(Expr::before(w("a"), w("b")), w("c"));
        let evaluator = Evaluator::default();
        let first = evaluator.evaluate(&node, "a b c").unwrap();
        let second = evaluator.evaluate(&node, "a b c").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_anchor_maps_back_to_source_text() {
        // 'İ' lowercases to two characters
        assert_eq!(eval(&w("x"), "İx"), MatchOutcome::hit(1));
        assert_eq!(eval(&Expr::before(w("i"), w("x")), "İİx"), MatchOutcome::hit(2));

        let exact = Evaluator::new(&MatchOptions::case_sensitive());
        assert_eq!(exact.evaluate(&w("x"), "İx").unwrap(), MatchOutcome::hit(1));
    }

    #[test]
    fn test_source_offset() {
        assert_eq!(source_offset("abc", 2), 2);
        assert_eq!(source_offset("İab", 2), 1);
        assert_eq!(source_offset("İab", 3), 2);
        assert_eq!(source_offset("ab", 5), 2);
    }

    #[test]
    fn test_long_chains_do_not_count_towards_depth() {
        let len = MAX_EVAL_DEPTH * 3;

        let mut or_chain = w("miss");
        let mut and_chain = w("a");
        let mut before_chain = w("a");
        for _ in 1..len {
            or_chain = Expr::or(or_chain, w("miss"));
            and_chain = Expr::and(and_chain, w("a"));
            before_chain = Expr::before(before_chain, w("a"));
        }
        let or_chain = Expr::or(or_chain, w("a"));

        assert_eq!(eval(&or_chain, "a"), MatchOutcome::hit(0));
        assert_eq!(eval(&and_chain, "a"), MatchOutcome::hit(0));

        let text = vec!["a"; len].join(" ");
        assert_eq!(eval(&before_chain, &text), MatchOutcome::hit(2 * (len - 1)));
        assert!(!matches(&before_chain, &text[2..]));
    }

    #[test]
    fn test_and_skips_right_side_after_miss() {
        // The right side would be rejected if it were visited
        let mut tall = w("a");
        for _ in 0..MAX_EVAL_DEPTH {
            tall = Expr::not(tall);
        }
        let node = Expr::and(w("absent"), tall);
        assert_eq!(eval(&node, "a"), MatchOutcome::miss());
    }

    #[test]
    fn test_tree_too_tall() {
        let mut node = w("a");
        for _ in 0..MAX_EVAL_DEPTH {
            node = Expr::not(node);
        }
        let result = Evaluator::default().evaluate(&node, "a");
        assert!(matches!(result, Err(EvalError::MalformedNode(_))));

        // Right-nested trees recurse on every level
        let mut node = w("a");
        for _ in 0..MAX_EVAL_DEPTH {
            node = Expr::or(w("b"), node);
        }
        let result = Evaluator::default().evaluate(&node, "a");
        assert!(matches!(result, Err(EvalError::MalformedNode(_))));
    }
}
