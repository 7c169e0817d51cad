//! Source positions and node spans.

use serde::Serialize;

/// A line/column location in the source. Both are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Loc {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The span a parsed node covers, plus the source label it came from.
///
/// `end` is always lexicographically >= `start`. The cursor consumes any
/// whitespace following the node as part of closing the span, so the cursor
/// ends up slightly past the node's literal text; the recorded `end` does
/// not include that whitespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub start: Loc,
    pub end: Loc,
    pub source: Option<String>,
}

/// Start-of-node snapshot returned by [`Cursor::mark`](crate::Cursor::mark).
///
/// Feed it back to [`Cursor::span`](crate::Cursor::span) once the node's own
/// content (not its trailing separators) has been consumed. Each mark closes
/// exactly one span.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct SpanMark {
    pub(crate) start: Loc,
}
