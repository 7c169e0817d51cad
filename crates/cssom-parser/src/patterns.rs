//! Compiled grammar patterns.
//!
//! Every pattern is anchored with `^` so the cursor can only ever consume a
//! prefix of the remaining input. Each accessor compiles its pattern once.
//!
//! The at-rule statement patterns (`@import`, `@namespace`) carry one
//! capture group per operand spelling (quoted string, `url("…")`,
//! `url('…')`, bare `url(…)`); the authoritative value is the first
//! non-empty group in pattern order.

use regex::Regex;
use std::sync::OnceLock;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        pub fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).expect(concat!("invalid pattern: ", stringify!($name))))
        }
    };
}

// Comment bodies embedded in property, value, and selector text are stripped
// after capture with this. It can misfire when a comment delimiter sits
// inside an unterminated quoted string.
pattern!(comment_text, r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/");

pattern!(selector_text, r"^([^{]+)");
pattern!(property, r"^(\*?[-#/*\\\w]+(?:\[[0-9a-z_-]+\])?)\s*");
pattern!(
    value,
    r#"^((?:'(?:\\'|.)*?'|"(?:\\"|.)*?"|\([^)]*?\)|[^};])+)"#
);
pattern!(colon, r"^:\s*");
pattern!(semicolons, r"^[;\s]*");
pattern!(open_brace, r"^\{\s*");
pattern!(close_brace, r"^\}");
pattern!(ident, r"^([-\w]+)\s*");
pattern!(comma, r"^,\s*");

// At-rule introducers, tried in dispatch order.
pattern!(at_keyframes, r"^@([-\w]+)?keyframes\s*");
pattern!(keyframe_selector, r"^((?:\d+\.\d+|\.\d+|\d+)%?|from|to)\s*");
pattern!(at_media, r"^@media *([^{]+)");
pattern!(at_custom_media, r"^@custom-media\s+(--\S+)\s*([^{;]+);");
pattern!(at_supports, r"^@supports *([^{]+)");
pattern!(
    at_import,
    r#"^@import\s*(?:"([^"]+)"|url\("([^"]+)"\)|'([^']+)'|url\('([^']+)'\)|url\(([^)]+)\))([^;]*);"#
);
pattern!(at_charset, r"^@charset\s*([^;]+);");
pattern!(
    at_namespace,
    r#"^@namespace\s+(?:(\w+)\s+)?(?:url\('([^']+)'\)|url\("([^"]+)"\)|"([^"]+)"|'([^']+)'|url\(([^)]+)\));"#
);
pattern!(at_document, r"^@([-\w]+)?document *([^{]+)");
pattern!(at_page, r"^@page *");
pattern!(at_host, r"^@host\s*");
pattern!(at_font_face, r"^@font-face\s*");

/// Strip embedded `/* … */` comments out of captured text.
pub fn strip_comments(text: &str) -> String {
    comment_text().replace_all(text, "").into_owned()
}
