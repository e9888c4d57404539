use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Default bound on nested groups and negations
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Ceiling applied to any configured `max_depth`
pub const MAX_DEPTH_LIMIT: usize = 256;

/// How a grouped `&` or `|` picks a single position when it is an operand of `<`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeAnchor {
    /// Position of the earliest matched term
    #[default]
    Earliest,
    /// Position of the latest matched term
    Latest,
}

impl CompositeAnchor {
    /// Combine the anchors of two matched sides
    ///
    /// When only one side carries an anchor, that anchor wins.
    pub fn pick(self, left: Option<usize>, right: Option<usize>) -> Option<usize> {
        match (left, right) {
            (Some(l), Some(r)) => Some(match self {
                CompositeAnchor::Earliest => l.min(r),
                CompositeAnchor::Latest => l.max(r),
            }),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeAnchor::Earliest => "earliest",
            CompositeAnchor::Latest => "latest",
        }
    }
}

impl fmt::Display for CompositeAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositeAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earliest" | "min" => Ok(CompositeAnchor::Earliest),
            "latest" | "max" => Ok(CompositeAnchor::Latest),
            other => Err(format!("unknown anchor policy '{}'", other)),
        }
    }
}

/// Options controlling how expressions are parsed and evaluated
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Fold text and terms to lowercase before comparing
    pub ignore_case: bool,
    pub composite_anchor: CompositeAnchor,
    /// Maximum nesting of groups and negations accepted by the parser,
    /// capped at [`MAX_DEPTH_LIMIT`]
    pub max_depth: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            composite_anchor: CompositeAnchor::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MatchOptions {
    /// Options that compare text exactly as written
    pub fn case_sensitive() -> Self {
        Self {
            ignore_case: false,
            ..Default::default()
        }
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_composite_anchor(mut self, policy: CompositeAnchor) -> Self {
        self.composite_anchor = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Apply case folding to `s` according to these options
    pub fn fold<'a>(&self, s: &'a str) -> Cow<'a, str> {
        if self.ignore_case {
            Cow::Owned(s.to_lowercase())
        } else {
            Cow::Borrowed(s)
        }
    }
}
