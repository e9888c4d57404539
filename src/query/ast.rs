//! Abstract Syntax Tree for match expressions
//!
//! An expression is a closed set of node kinds. Each node owns its children
//! outright, so a tree is never shared or cyclic, and a node always has every
//! operand its kind requires.
//!
//! Long chains such as `a | b | c | ...` fold into trees as tall as the
//! chain, so dropping and rendering walk the tree with an explicit stack.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;

/// A parsed match expression
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    /// A search term after escape resolution
    Literal {
        text: String,
        /// Whether the term was written between quotes
        #[serde(default)]
        quoted: bool,
    },
    /// `~operand`
    Not { operand: Box<Expr> },
    /// `left < right`: `right` occurs after `left`
    Before { left: Box<Expr>, right: Box<Expr> },
    /// `left & right`
    And { left: Box<Expr>, right: Box<Expr> },
    /// `left | right`
    Or { left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    /// Create an unquoted term
    pub fn word(text: impl Into<String>) -> Self {
        Expr::Literal {
            text: text.into(),
            quoted: false,
        }
    }

    /// Create a quoted term
    pub fn quoted(text: impl Into<String>) -> Self {
        Expr::Literal {
            text: text.into(),
            quoted: true,
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not {
            operand: Box::new(operand),
        }
    }

    pub fn before(left: Expr, right: Expr) -> Self {
        Expr::Before {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Get the node type name for debugging and logging
    pub fn node_type(&self) -> &'static str {
        match self {
            Expr::Literal { .. } => "literal",
            Expr::Not { .. } => "not",
            Expr::Before { .. } => "before",
            Expr::And { .. } => "and",
            Expr::Or { .. } => "or",
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal { .. })
    }

    /// Height of the tree; a single term has depth 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            match node {
                Expr::Literal { .. } => {}
                Expr::Not { operand } => stack.push((operand.as_ref(), depth + 1)),
                Expr::Before { left, right }
                | Expr::And { left, right }
                | Expr::Or { left, right } => {
                    stack.push((left.as_ref(), depth + 1));
                    stack.push((right.as_ref(), depth + 1));
                }
            }
        }
        deepest
    }

    /// All search terms in the order they appear in the expression
    pub fn terms(&self) -> Vec<&str> {
        let mut terms = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Expr::Literal { text, .. } => terms.push(text.as_str()),
                Expr::Not { operand } => stack.push(operand.as_ref()),
                Expr::Before { left, right }
                | Expr::And { left, right }
                | Expr::Or { left, right } => {
                    stack.push(right.as_ref());
                    stack.push(left.as_ref());
                }
            }
        }
        terms
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        detach_children(self, &mut stack);
        while let Some(mut node) = stack.pop() {
            detach_children(&mut node, &mut stack);
        }
    }
}

/// Move the non-leaf children of `node` onto `stack`, leaving empty leaves
fn detach_children(node: &mut Expr, stack: &mut Vec<Expr>) {
    match node {
        Expr::Literal { .. } => {}
        Expr::Not { operand } => detach(operand, stack),
        Expr::Before { left, right } | Expr::And { left, right } | Expr::Or { left, right } => {
            detach(left, stack);
            detach(right, stack);
        }
    }
}

fn detach(child: &mut Expr, stack: &mut Vec<Expr>) {
    if !child.is_literal() {
        stack.push(mem::replace(child, Expr::word(String::new())));
    }
}

enum Piece<'a> {
    Node(&'a Expr),
    Text(&'static str),
}

/// Renders the expression back into query syntax
///
/// Every binary node is wrapped in parentheses, so the output parses back
/// into an identical tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Node(self)];
        while let Some(piece) = stack.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node) => node,
            };

            let (left, op, right) = match node {
                Expr::Literal { text, quoted } => {
                    if *quoted || text.is_empty() {
                        write_quoted(f, text)?;
                    } else {
                        write_word(f, text)?;
                    }
                    continue;
                }
                Expr::Not { operand } => {
                    f.write_str("~")?;
                    stack.push(Piece::Node(operand));
                    continue;
                }
                Expr::Before { left, right } => (left, " < ", right),
                Expr::And { left, right } => (left, " & ", right),
                Expr::Or { left, right } => (left, " | ", right),
            };

            f.write_str("(")?;
            stack.push(Piece::Text(")"));
            stack.push(Piece::Node(right));
            stack.push(Piece::Text(op));
            stack.push(Piece::Node(left));
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", ch)?;
    }
    f.write_str("\"")
}

fn write_word(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for ch in text.chars() {
        let special = ch.is_whitespace()
            || ch.is_control()
            || matches!(ch, '~' | '<' | '&' | '|' | '(' | ')' | '"' | '\'' | '\\');
        if special {
            f.write_str("\\")?;
        }
        write!(f, "{}", ch)?;
    }
    Ok(())
}
