//! cssom-scan
//!
//! Scanning layer for the cssom CSS parser: a cursor that consumes anchored
//! patterns from the remaining input while tracking line/column, the span
//! types stamped onto every parsed node, and the shared parse-error type.
//!
//! Grammar rules built on top of the cursor report one of three outcomes,
//! and the distinction between the last two is load-bearing:
//!
//! - [`Parse::Matched`] — the construct was present and was parsed.
//! - [`Parse::Absent`] — the alternative is not present; the caller may try
//!   the next alternative or end its loop.
//! - [`Parse::Failed`] — a required continuation was missing while parsing
//!   in silent mode; every caller must stop and propagate this, never treat
//!   it as "absent".
//!
//! In fail-fast mode (the default) a missing continuation is an `Err` and
//! unwinds the whole parse through `?` instead.

pub mod cursor;
pub mod position;

pub use cursor::Cursor;
pub use position::{Loc, Position, SpanMark};

use serde::Serialize;

/// Opaque handle to whatever owns the stylesheet in the embedding
/// application. Carried through the parse untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerHandle(pub usize);

/// Configuration for one parse call.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Label for the source (a file name or URL), used in spans and errors.
    pub source: Option<String>,
    /// When true, errors are accumulated and the parse returns a
    /// best-effort tree instead of aborting on the first failure.
    pub silent: bool,
    /// Opaque owner handle, passed through to the stylesheet.
    pub owner: Option<OwnerHandle>,
}

/// Which structural requirement a parse error violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// A required `{`, `}`, or `:` was missing.
    Structural,
    /// An at-rule identifier was required but absent.
    MissingName,
    /// A rule had no selector text.
    MissingSelector,
    /// A comment was opened and never closed.
    UnterminatedComment,
}

/// A parse error, carrying the location it was raised at and the full
/// original source text.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[error("{}:{line}:{column}: {message}", .filename.as_deref().unwrap_or("<input>"))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    /// Source label from [`ParseOptions::source`], if any.
    pub filename: Option<String>,
    pub line: usize,
    pub column: usize,
    /// The complete text the parse was invoked on.
    pub css: String,
}

/// Outcome of attempting one grammar alternative.
///
/// `Absent` means "try the next alternative"; `Failed` means "a required
/// continuation was missing, stop". Collapsing the two makes malformed
/// input parse as empty input.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Parse<T> {
    Matched(T),
    Absent,
    Failed,
}

impl<T> Parse<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Parse::Failed)
    }

    /// The matched value, if any. `Absent` and `Failed` both yield `None`;
    /// callers that need to tell them apart must match instead.
    pub fn matched(self) -> Option<T> {
        match self {
            Parse::Matched(value) => Some(value),
            _ => None,
        }
    }
}

/// Result of a grammar rule: `Err` aborts a fail-fast parse, the `Parse`
/// layer carries the silent-mode outcome.
pub type ParseResult<T> = Result<Parse<T>, ParseError>;
