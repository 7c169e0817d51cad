//! cssom-parser
//!
//! Parses CSS source text into a tree mirroring the CSS object model: a
//! [`StyleSheet`] holding an ordered collection of rules (style rules and
//! the `@media`/`@keyframes`/`@supports`/… at-rules), every node annotated
//! with its source line/column span and linked back to its nearest
//! enclosing rule.
//!
//! This is a syntax-level parser only: it does not validate property
//! values, match selectors, or compute the cascade.
//!
//! # Example
//!
//! ```
//! use cssom_parser::{parse, ParseOptions, RuleKind};
//!
//! let sheet = parse("body { color: black }", ParseOptions::default()).unwrap();
//! let rule = sheet.rule(sheet.css_rules()[0]).unwrap();
//! match &rule.kind {
//!     RuleKind::Style { selector_text, style } => {
//!         assert_eq!(selector_text, "body");
//!         assert_eq!(style.value_of("color"), Some("black"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

mod at_rule;
mod grammar;
pub mod om;
mod patterns;

pub use grammar::parse;
pub use om::{Declaration, MediaList, Rule, RuleId, RuleKind, Style, StyleSheet};

pub use cssom_scan::{
    ErrorKind, Loc, OwnerHandle, Parse, ParseError, ParseOptions, ParseResult, Position,
};
