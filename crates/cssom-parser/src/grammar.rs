//! Recursive-descent grammar: declarations, selectors, rule lists, and the
//! top-level parse entry point.
//!
//! Grammar methods return [`ParseResult`]: `Err` unwinds a fail-fast parse,
//! `Parse::Failed` is the silent-mode sentinel that every caller propagates
//! with [`try_rule!`], and `Parse::Absent` lets the caller try the next
//! alternative. Rules are pushed into the arena bottom-up (children before
//! parents); parent back-references are attached by the linking pass once
//! the whole tree exists.

use tracing::debug;

use cssom_scan::{Cursor, ErrorKind, Parse, ParseOptions, ParseResult};

use crate::om::{Declaration, MediaList, Rule, RuleId, Style, StyleSheet};
use crate::patterns;

/// Propagate the `Failed` sentinel the way `?` propagates `Err`: evaluates
/// a [`ParseResult`], returning early on `Err` and on `Failed`, and yields
/// the remaining `Matched`/`Absent` outcome.
macro_rules! try_rule {
    ($expr:expr) => {
        match $expr? {
            Parse::Failed => return Ok(Parse::Failed),
            outcome => outcome,
        }
    };
}
pub(crate) use try_rule;

/// Parse CSS source text into a [`StyleSheet`].
///
/// With `options.silent` unset the first structural problem aborts the
/// parse with `Err`; with it set, errors are accumulated on the sheet and a
/// best-effort tree is returned.
pub fn parse(css: &str, options: ParseOptions) -> Result<StyleSheet, cssom_scan::ParseError> {
    debug!(len = css.len(), "parsing stylesheet");
    let owner = options.owner;
    let mut parser = Parser::new(css, options);

    let css_rules = match parser.rule_list("")? {
        Parse::Matched(ids) => ids,
        Parse::Absent | Parse::Failed => Vec::new(),
    };

    let mut sheet = StyleSheet {
        media: MediaList::default(),
        css_rules,
        owner,
        disabled: false,
        encoding: parser.encoding,
        errors: parser.cursor.take_errors(),
        arena: parser.arena,
    };
    sheet.link_parents();
    debug!(
        rules = sheet.css_rules.len(),
        errors = sheet.errors.len(),
        "stylesheet parsed"
    );
    Ok(sheet)
}

/// One parse in flight: the cursor plus the rule arena being built.
pub(crate) struct Parser<'a> {
    pub(crate) cursor: Cursor<'a>,
    pub(crate) arena: Vec<Rule>,
    pub(crate) encoding: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(css: &'a str, options: ParseOptions) -> Self {
        Self {
            cursor: Cursor::new(css, options),
            arena: Vec::new(),
            encoding: None,
        }
    }

    pub(crate) fn push(&mut self, rule: Rule) -> RuleId {
        self.arena.push(rule);
        RuleId(self.arena.len() - 1)
    }

    fn open(&mut self) -> bool {
        self.cursor.match_pattern(patterns::open_brace()).is_some()
    }

    fn close(&mut self) -> bool {
        self.cursor.match_pattern(patterns::close_brace()).is_some()
    }

    // =========================================================================
    // Rule lists
    // =========================================================================

    /// Parse a run of rules. A non-empty `scope` labels a braced block (the
    /// body of a grouping at-rule) whose `{` and `}` are mandatory; the
    /// empty scope is the unbraced top level.
    ///
    /// A `Failed` iteration aborts the loop immediately — the failing
    /// alternative has already consumed input, so looping on would either
    /// spin or misparse. Rules collected before the failure are kept.
    pub(crate) fn rule_list(&mut self, scope: &str) -> ParseResult<Vec<RuleId>> {
        if !scope.is_empty() && !self.open() {
            return self
                .cursor
                .fail(ErrorKind::Structural, format!("{scope}missing '{{'"));
        }

        self.cursor.skip_whitespace();
        let comments_ok = !self.comments()?.is_failed();
        self.cursor.skip_whitespace();

        let mut ids = Vec::new();
        while comments_ok && !self.cursor.is_eof() && self.cursor.peek() != Some('}') {
            match self.at_rule()? {
                Parse::Matched(Some(id)) => ids.push(id),
                // A charset statement: parsed to advance the cursor and
                // record the encoding, excluded from the tree.
                Parse::Matched(None) => {}
                Parse::Failed => break,
                Parse::Absent => match self.style_rule()? {
                    Parse::Matched(id) => ids.push(id),
                    Parse::Absent | Parse::Failed => break,
                },
            }
            self.cursor.skip_whitespace();
            if self.comments()?.is_failed() {
                break;
            }
            self.cursor.skip_whitespace();
        }

        if !scope.is_empty() && !self.close() {
            return self
                .cursor
                .fail(ErrorKind::Structural, format!("{scope}missing '}}'"));
        }

        Ok(Parse::Matched(ids))
    }

    // =========================================================================
    // Style rules and selectors
    // =========================================================================

    /// Parse a plain `selector-list { declarations }` rule. A missing or
    /// empty selector list is a hard failure, not an absent alternative.
    pub(crate) fn style_rule(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();

        let selectors = match try_rule!(self.selector_list()) {
            Parse::Matched(selectors) if !selectors.is_empty() => selectors,
            _ => return self.cursor.fail(ErrorKind::MissingSelector, "selector missing"),
        };

        try_rule!(self.comments());

        let Parse::Matched(style) = try_rule!(self.declaration_block("")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        let rule = Rule::style_rule(selectors.join(", "), style, position);
        Ok(Parse::Matched(self.push(rule)))
    }

    /// Consume raw selector text up to `{` and split it into individual
    /// selectors on unprotected commas.
    pub(crate) fn selector_list(&mut self) -> ParseResult<Vec<String>> {
        let Some(caps) = self.cursor.match_pattern(patterns::selector_text()) else {
            return Ok(Parse::Absent);
        };
        let cleaned = patterns::strip_comments(caps[0].trim());
        Ok(Parse::Matched(split_guarded(&cleaned)))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Parse a braced declaration block. `scope` labels error messages
    /// (`"@font-face missing '{'"` and the like).
    pub(crate) fn declaration_block(&mut self, scope: &str) -> ParseResult<Style> {
        self.cursor.skip_whitespace();
        if !self.open() {
            return self
                .cursor
                .fail(ErrorKind::Structural, format!("{scope}missing '{{'"));
        }
        try_rule!(self.comments());

        let mut declarations = Vec::new();
        while let Parse::Matched(decl) = try_rule!(self.declaration()) {
            declarations.push(decl);
            self.cursor.skip_whitespace();
            try_rule!(self.comments());
            self.cursor.skip_whitespace();
        }

        if !self.close() {
            return self
                .cursor
                .fail(ErrorKind::Structural, format!("{scope}missing '}}'"));
        }
        Ok(Parse::Matched(Style::new(declarations)))
    }

    /// Parse one `property: value` declaration. The span closes after the
    /// value; the trailing semicolon run is consumed afterwards.
    pub(crate) fn declaration(&mut self) -> ParseResult<Declaration> {
        let mark = self.cursor.mark();

        let Some(prop) = self.cursor.match_pattern(patterns::property()) else {
            return Ok(Parse::Absent);
        };
        let property = patterns::strip_comments(&prop[1]);

        if self.cursor.match_pattern(patterns::colon()).is_none() {
            return self
                .cursor
                .fail(ErrorKind::Structural, "property missing ':'");
        }

        let value = match self.cursor.match_pattern(patterns::value()) {
            Some(caps) => patterns::strip_comments(&caps[1]).trim().to_string(),
            None => String::new(),
        };

        let position = self.cursor.span(mark);
        let _ = self.cursor.match_pattern(patterns::semicolons());

        Ok(Parse::Matched(Declaration {
            property,
            value,
            position,
        }))
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Skip any run of comments. Comment text never reaches the tree.
    pub(crate) fn comments(&mut self) -> ParseResult<()> {
        loop {
            match try_rule!(self.comment()) {
                Parse::Matched(()) => {}
                _ => return Ok(Parse::Matched(())),
            }
        }
    }

    /// Consume a single `/* … */` comment, or fail if it never closes.
    pub(crate) fn comment(&mut self) -> ParseResult<()> {
        let mark = self.cursor.mark();
        if !self.cursor.rest().starts_with("/*") {
            return Ok(Parse::Absent);
        }
        match self.cursor.rest()[2..].find("*/") {
            Some(at) => {
                self.cursor.consume(at + 4);
                let _ = self.cursor.span(mark);
                Ok(Parse::Matched(()))
            }
            None => self
                .cursor
                .fail(ErrorKind::UnterminatedComment, "end of comment missing"),
        }
    }
}

const COMMA_SENTINEL: char = '\u{200C}';

/// Split selector text on top-level commas. Commas inside quoted strings or
/// parenthesized groups are swapped for a sentinel before the split and
/// restored afterwards.
pub(crate) fn split_guarded(text: &str) -> Vec<String> {
    let mut protected = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth: usize = 0;

    for ch in text.chars() {
        if escaped {
            protected.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if quote.is_some() => {
                protected.push(ch);
                escaped = true;
            }
            '"' | '\'' => {
                protected.push(ch);
                match quote {
                    Some(open) if open == ch => quote = None,
                    None => quote = Some(ch),
                    Some(_) => {}
                }
            }
            '(' if quote.is_none() => {
                depth += 1;
                protected.push(ch);
            }
            ')' if quote.is_none() => {
                depth = depth.saturating_sub(1);
                protected.push(ch);
            }
            ',' if quote.is_some() || depth > 0 => protected.push(COMMA_SENTINEL),
            other => protected.push(other),
        }
    }

    protected
        .split(',')
        .map(|piece| piece.trim().replace(COMMA_SENTINEL, ","))
        .filter(|piece| !piece.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::om::RuleKind;
    use cssom_scan::Loc;
    use pretty_assertions::assert_eq;

    fn parse_ok(css: &str) -> StyleSheet {
        parse(css, ParseOptions::default()).unwrap()
    }

    fn parse_silent(css: &str) -> StyleSheet {
        parse(
            css,
            ParseOptions {
                silent: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn first(sheet: &StyleSheet) -> &Rule {
        sheet.rule(sheet.css_rules()[0]).unwrap()
    }

    fn style_of(rule: &Rule) -> &Style {
        match &rule.kind {
            RuleKind::Style { style, .. } => style,
            other => panic!("expected style rule, got {}", other.name()),
        }
    }

    fn selector_of(rule: &Rule) -> &str {
        match &rule.kind {
            RuleKind::Style { selector_text, .. } => selector_text,
            other => panic!("expected style rule, got {}", other.name()),
        }
    }

    // =========================================================================
    // Empty and trivial input
    // =========================================================================

    #[test]
    fn test_empty_input() {
        let sheet = parse_ok("");
        assert!(sheet.css_rules().is_empty());
        assert!(sheet.errors().is_empty());
        assert_eq!(sheet.content_type(), "text/css");
        assert!(sheet.media().is_empty());
    }

    #[test]
    fn test_whitespace_and_comments_only() {
        let sheet = parse_ok("  /* a */\n/* b */  ");
        assert!(sheet.css_rules().is_empty());
    }

    #[test]
    fn test_single_rule() {
        let sheet = parse_ok("body { color: black; }");
        assert_eq!(sheet.css_rules().len(), 1);
        let rule = first(&sheet);
        assert_eq!(selector_of(rule), "body");
        let style = style_of(rule);
        assert_eq!(style.len(), 1);
        assert_eq!(style.item(0).unwrap().property, "color");
        assert_eq!(style.item(0).unwrap().value, "black");
    }

    #[test]
    fn test_rule_order_preserved() {
        let sheet = parse_ok("a{x:1}\nb{x:2}\nc{x:3}");
        let selectors: Vec<_> = sheet.top_level().map(selector_of).collect();
        assert_eq!(selectors, vec!["a", "b", "c"]);
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn test_declaration_round_trip() {
        let sheet = parse_ok("a { color: red; margin: 0 auto; color: blue }");
        let style = style_of(first(&sheet));
        assert_eq!(style.css_text(), "color: red; margin: 0 auto; color: blue");
    }

    #[test]
    fn test_duplicate_properties_retained() {
        let sheet = parse_ok("a { color: red; color: blue; }");
        let style = style_of(first(&sheet));
        assert_eq!(style.len(), 2);
        assert_eq!(style.value_of("color"), Some("blue"));
    }

    #[test]
    fn test_last_declaration_without_semicolon() {
        let sheet = parse_ok("a { color: red; width: 10px }");
        assert_eq!(style_of(first(&sheet)).len(), 2);
    }

    #[test]
    fn test_empty_declaration_block() {
        let sheet = parse_ok("a {}");
        assert!(style_of(first(&sheet)).is_empty());
    }

    #[test]
    fn test_value_protects_quoted_semicolon() {
        let sheet = parse_ok("a { content: ';'; color: red }");
        let style = style_of(first(&sheet));
        assert_eq!(style.value_of("content"), Some("';'"));
        assert_eq!(style.len(), 2);
    }

    #[test]
    fn test_value_protects_parenthesized_group() {
        let sheet = parse_ok("a { background: url(a;b.png) }");
        assert_eq!(
            style_of(first(&sheet)).value_of("background"),
            Some("url(a;b.png)")
        );
    }

    #[test]
    fn test_vendor_and_custom_properties() {
        let sheet = parse_ok("a { -webkit-box-shadow: none; --accent: #fff; *zoom: 1 }");
        let style = style_of(first(&sheet));
        assert_eq!(style.item(0).unwrap().property, "-webkit-box-shadow");
        assert_eq!(style.item(1).unwrap().property, "--accent");
        assert_eq!(style.item(2).unwrap().property, "*zoom");
    }

    #[test]
    fn test_comment_stripped_from_value() {
        let sheet = parse_ok("a { color: red /* not blue */ }");
        assert_eq!(style_of(first(&sheet)).value_of("color"), Some("red"));
    }

    #[test]
    fn test_comments_between_declarations() {
        let sheet = parse_ok("a { /* lead */ color: red; /* mid */ width: 0; /* tail */ }");
        assert_eq!(style_of(first(&sheet)).len(), 2);
    }

    #[test]
    fn test_missing_colon_is_structural_error() {
        let err = parse("a { color red }", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structural);
        assert_eq!(err.message, "property missing ':'");
    }

    #[test]
    fn test_missing_close_brace_error_mentions_scope() {
        let err = parse("@font-face { src: url(x.woff2)", ParseOptions::default()).unwrap_err();
        assert_eq!(err.message, "@font-face missing '}'");
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    #[test]
    fn test_selector_list_joined() {
        let sheet = parse_ok("h1, h2 , h3 { margin: 0 }");
        assert_eq!(selector_of(first(&sheet)), "h1, h2, h3");
    }

    #[test]
    fn test_quoted_comma_not_a_separator() {
        assert_eq!(
            split_guarded(r#"a, b.c, d[foo="x,y"]"#),
            vec!["a", "b.c", r#"d[foo="x,y"]"#]
        );
    }

    #[test]
    fn test_parenthesized_comma_not_a_separator() {
        assert_eq!(
            split_guarded("a:not(.x, .y), b"),
            vec!["a:not(.x, .y)", "b"]
        );
    }

    #[test]
    fn test_escaped_quote_inside_selector_string() {
        assert_eq!(
            split_guarded(r#"a[title="he said \",\" twice"], b"#),
            vec![r#"a[title="he said \",\" twice"]"#, "b"]
        );
    }

    #[test]
    fn test_selector_rule_end_to_end_with_quoted_comma() {
        let sheet = parse_ok(r#"a, b.c, d[foo="x,y"] { color: red }"#);
        assert_eq!(selector_of(first(&sheet)), r#"a, b.c, d[foo="x,y"]"#);
    }

    #[test]
    fn test_missing_selector_is_hard_failure() {
        let err = parse("{ color: red }", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingSelector);
        assert_eq!(err.message, "selector missing");
    }

    #[test]
    fn test_unknown_at_rule_falls_through_to_style_rule() {
        let sheet = parse_ok("@layer base {color:red}");
        let rule = first(&sheet);
        assert_eq!(selector_of(rule), "@layer base");
    }

    // =========================================================================
    // Comments
    // =========================================================================

    #[test]
    fn test_unterminated_comment_fails() {
        let err = parse("/* never closed", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedComment);
        assert_eq!(err.message, "end of comment missing");
    }

    #[test]
    fn test_comment_between_selector_and_block() {
        let sheet = parse_ok("a /* note */ { color: red }");
        assert_eq!(style_of(first(&sheet)).len(), 1);
    }

    // =========================================================================
    // Silent mode
    // =========================================================================

    #[test]
    fn test_silent_missing_close_brace_is_best_effort() {
        let sheet = parse_silent("a{color:red");
        assert!(!sheet.errors().is_empty());
        assert!(sheet.css_rules().is_empty());
    }

    #[test]
    fn test_silent_failure_keeps_earlier_rules() {
        let sheet = parse_silent("b { x: y }\na{color:red");
        assert_eq!(sheet.css_rules().len(), 1);
        assert_eq!(selector_of(first(&sheet)), "b");
        assert_eq!(sheet.errors().len(), 1);
    }

    #[test]
    fn test_silent_error_carries_location_and_source_text() {
        let css = "a{color:red";
        let sheet = parse_silent(css);
        let err = &sheet.errors()[0];
        assert_eq!(err.css, css);
        assert_eq!(err.line, 1);
        assert!(err.column > 1);
    }

    #[test]
    fn test_strict_mode_returns_no_partial_tree() {
        assert!(parse("b { x: y }\na{color:red", ParseOptions::default()).is_err());
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[test]
    fn test_rule_position_spans_rule() {
        let sheet = parse_ok("a { color: red }\n");
        let rule = first(&sheet);
        assert_eq!(rule.position.start, Loc::new(1, 1));
        assert_eq!(rule.position.end, Loc::new(1, 17));
    }

    #[test]
    fn test_declaration_positions_track_lines() {
        let sheet = parse_ok("a {\n  color: red;\n  width: 0;\n}");
        let style = style_of(first(&sheet));
        assert_eq!(style.item(0).unwrap().position.start, Loc::new(2, 3));
        assert_eq!(style.item(1).unwrap().position.start, Loc::new(3, 3));
    }

    #[test]
    fn test_positions_are_idempotent_across_parses() {
        let css = "a{x:1}\n@media screen{b{y:2}}\n";
        let one = parse_ok(css);
        let two = parse_ok(css);
        let spans = |sheet: &StyleSheet| {
            sheet
                .all_rules()
                .map(|(_, rule)| rule.position.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(spans(&one), spans(&two));
    }

    #[test]
    fn test_position_end_not_before_start() {
        let sheet = parse_ok("a { b: c }\n\nd, e { f: g; h: i }");
        for (_, rule) in sheet.all_rules() {
            assert!(rule.position.end >= rule.position.start);
        }
    }

    #[test]
    fn test_position_carries_source_label() {
        let sheet = parse(
            "a{b:c}",
            ParseOptions {
                source: Some("main.css".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            first(&sheet).position.source.as_deref(),
            Some("main.css")
        );
    }

    // =========================================================================
    // Parent linking
    // =========================================================================

    #[test]
    fn test_owner_handle_passthrough() {
        use cssom_scan::OwnerHandle;
        let sheet = parse(
            "a{b:c}",
            ParseOptions {
                owner: Some(OwnerHandle(7)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(sheet.owner(), Some(OwnerHandle(7)));
    }

    #[test]
    fn test_sheet_starts_enabled() {
        let mut sheet = parse_ok("a{b:c}");
        assert!(!sheet.disabled());
        sheet.set_disabled(true);
        assert!(sheet.disabled());
    }

    #[test]
    fn test_top_level_rules_have_no_parent() {
        let sheet = parse_ok("a{x:1}b{y:2}");
        for rule in sheet.top_level() {
            assert!(rule.parent_rule.is_none());
        }
    }

    #[test]
    fn test_nested_rule_parent_is_nearest_container() {
        let sheet = parse_ok("@media screen { @supports (display: flex) { a { x: 1 } } }");
        let media_id = sheet.css_rules()[0];
        let media = sheet.rule(media_id).unwrap();
        let supports_id = media.kind.children()[0];
        let supports = sheet.rule(supports_id).unwrap();
        let style_id = supports.kind.children()[0];

        assert_eq!(media.parent_rule, None);
        assert_eq!(supports.parent_rule, Some(media_id));
        assert_eq!(sheet.rule(style_id).unwrap().parent_rule, Some(supports_id));
        assert_eq!(
            sheet.parent_rule(style_id).unwrap().kind.name(),
            "supports"
        );
    }

    #[test]
    fn test_sheet_serializes_to_json() {
        let sheet = parse_ok("@media screen{a{color:red}}");
        let json = serde_json::to_value(&sheet).unwrap();
        let rules = json["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert!(json["css_rules"].is_array());
    }

    #[test]
    fn test_every_rule_reachable_from_root() {
        let sheet = parse_ok("@media screen { a { x: 1 } }\n@host { b { y: 2 } }\nc { z: 3 }");
        let mut reachable = vec![false; sheet.all_rules().count()];
        fn visit(sheet: &StyleSheet, id: RuleId, seen: &mut [bool]) {
            seen[id.0] = true;
            for child in sheet.rule(id).unwrap().kind.children() {
                visit(sheet, *child, seen);
            }
        }
        for id in sheet.css_rules() {
            visit(&sheet, *id, &mut reachable);
        }
        assert!(reachable.iter().all(|seen| *seen));
    }
}
