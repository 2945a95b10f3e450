//! Source location tracking
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// A span covers a range of source text, as line/column pairs (1-based).
///
/// Serialized the way the ChocoPy reference front end writes locations:
/// `[line, col, endLine, endCol]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    /// Create a new span
    pub fn new(line: u32, col: u32, end_line: u32, end_col: u32) -> Self {
        Self { line, col, end_line, end_col }
    }

    /// Create a dummy span (for testing and synthesized nodes)
    pub fn dummy() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Merge two spans
    pub fn merge(&self, other: &Span) -> Span {
        let (line, col) = (self.line, self.col).min((other.line, other.col));
        let (end_line, end_col) = (self.end_line, self.end_col).max((other.end_line, other.end_col));
        Span { line, col, end_line, end_col }
    }

    /// Check if the span carries no location
    pub fn is_dummy(&self) -> bool {
        self.line == 0 && self.col == 0
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

impl From<[u32; 4]> for Span {
    fn from(loc: [u32; 4]) -> Self {
        Span::new(loc[0], loc[1], loc[2], loc[3])
    }
}

impl From<Span> for [u32; 4] {
    fn from(span: Span) -> Self {
        [span.line, span.col, span.end_line, span.end_col]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
