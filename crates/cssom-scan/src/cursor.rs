//! The position-tracked consumption primitive.
//!
//! A [`Cursor`] owns the remaining input (as an offset into the original
//! text), the current line/column, the parse options, and the error list
//! used in silent mode. All grammar rules consume input exclusively through
//! it, so the no-mutation-on-miss guarantee of [`Cursor::match_pattern`] is
//! what lets callers try grammar alternatives safely.

use regex::{Captures, Regex};

use crate::position::{Loc, Position, SpanMark};
use crate::{ErrorKind, Parse, ParseError, ParseOptions, ParseResult};

/// Cursor over one CSS source string. Exclusively owned by a single parse
/// call and discarded when it completes.
pub struct Cursor<'a> {
    css: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    options: ParseOptions,
    errors: Vec<ParseError>,
}

impl<'a> Cursor<'a> {
    pub fn new(css: &'a str, options: ParseOptions) -> Self {
        Self {
            css,
            offset: 0,
            line: 1,
            column: 1,
            options,
            errors: Vec::new(),
        }
    }

    /// The not-yet-consumed tail of the input.
    pub fn rest(&self) -> &'a str {
        &self.css[self.offset..]
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.css.len()
    }

    /// Next char of the remaining input, if any.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn silent(&self) -> bool {
        self.options.silent
    }

    /// Errors recorded so far in silent mode, drained for the caller.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Attempt to consume a prefix of the remaining input matching `re`.
    ///
    /// Every pattern handed in here is anchored with `^`. On a hit the
    /// cursor advances over the whole match (updating line/column) and the
    /// captures are returned; on a miss nothing is mutated and `None` is
    /// returned, leaving the caller free to try another alternative.
    pub fn match_pattern(&mut self, re: &Regex) -> Option<Captures<'a>> {
        debug_assert!(re.as_str().starts_with('^'), "pattern must be anchored");
        let caps = re.captures(self.rest())?;
        let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        self.consume(end);
        Some(caps)
    }

    /// Consume exactly `len` bytes of the remaining input, advancing
    /// line/column over them. `len` must lie on a char boundary.
    pub fn consume(&mut self, len: usize) -> &'a str {
        let text = &self.rest()[..len];
        let newlines = text.matches('\n').count();
        if newlines > 0 {
            self.line += newlines;
            // Column restarts after the last newline consumed.
            let tail = &text[text.rfind('\n').map(|i| i + 1).unwrap_or(0)..];
            self.column = tail.chars().count() + 1;
        } else {
            self.column += text.chars().count();
        }
        self.offset += len;
        text
    }

    /// Consume any run of leading whitespace.
    pub fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start().len();
        if len > 0 {
            self.consume(len);
        }
    }

    /// Current location.
    pub fn loc(&self) -> Loc {
        Loc::new(self.line, self.column)
    }

    /// Snapshot the current location as the start of a node span.
    pub fn mark(&self) -> SpanMark {
        SpanMark { start: self.loc() }
    }

    /// Close the span opened by `mark`: `end` is the current location, and
    /// the whitespace trailing the node is consumed afterwards, so the
    /// cursor moves slightly past the node's literal text.
    pub fn span(&mut self, mark: SpanMark) -> Position {
        let position = Position {
            start: mark.start,
            end: self.loc(),
            source: self.options.source.clone(),
        };
        self.skip_whitespace();
        position
    }

    /// Build a parse error at the current location.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> ParseError {
        ParseError {
            kind,
            message: message.into(),
            filename: self.options.source.clone(),
            line: self.line,
            column: self.column,
            css: self.css.to_string(),
        }
    }

    /// Report a missing required continuation.
    ///
    /// Silent mode records the error and yields the [`Parse::Failed`]
    /// sentinel for the caller to propagate; otherwise the error aborts the
    /// parse through `Err`.
    pub fn fail<T>(&mut self, kind: ErrorKind, message: impl Into<String>) -> ParseResult<T> {
        let err = self.error(kind, message);
        if self.options.silent {
            self.errors.push(err);
            Ok(Parse::Failed)
        } else {
            Err(err)
        }
    }
}
