//! At-rule grammars and their dispatcher.
//!
//! On `@` the dispatcher tries each introducer in fixed priority order; the
//! first pattern that matches wins, and an unmatched `@…` falls back to the
//! plain-rule path in the rule-list loop. Grouping at-rules recurse into the
//! rule-list or declaration-block parsers; statement at-rules (`@import`,
//! `@charset`, `@namespace`, `@custom-media`) are consumed whole, terminating
//! `;` included, by a single pattern.

use regex::Captures;

use cssom_scan::{ErrorKind, Parse, ParseResult};

use crate::grammar::{try_rule, Parser};
use crate::om::{MediaList, Rule, RuleId};
use crate::patterns;

/// First non-empty capture among the operand groups `range`, trimmed.
/// Statement patterns spell the same operand several ways (quoted,
/// `url("…")`, `url('…')`, bare `url(…)`); pattern order decides.
fn first_operand(caps: &Captures<'_>, range: std::ops::RangeInclusive<usize>) -> String {
    range
        .filter_map(|group| caps.get(group))
        .map(|m| m.as_str())
        .find(|text| !text.is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

impl Parser<'_> {
    /// Try every at-rule grammar in priority order.
    ///
    /// `Matched(None)` is a charset statement: the cursor advanced and the
    /// encoding was recorded, but no node joins the tree.
    pub(crate) fn at_rule(&mut self) -> ParseResult<Option<RuleId>> {
        if self.cursor.peek() != Some('@') {
            return Ok(Parse::Absent);
        }

        if let Parse::Matched(id) = try_rule!(self.at_keyframes()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_media()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_custom_media()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_supports()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_import()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(()) = try_rule!(self.at_charset()) {
            return Ok(Parse::Matched(None));
        }
        if let Parse::Matched(id) = try_rule!(self.at_namespace()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_document()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_page()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_host()) {
            return Ok(Parse::Matched(Some(id)));
        }
        if let Parse::Matched(id) = try_rule!(self.at_font_face()) {
            return Ok(Parse::Matched(Some(id)));
        }

        Ok(Parse::Absent)
    }

    // =========================================================================
    // Grouping at-rules
    // =========================================================================

    /// `@keyframes name { <keyframe>* }`, with an optional vendor infix.
    fn at_keyframes(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_keyframes()) else {
            return Ok(Parse::Absent);
        };
        let vendor = caps.get(1).map(|m| m.as_str().to_string());

        let Some(name) = self.cursor.match_pattern(patterns::ident()) else {
            return self
                .cursor
                .fail(ErrorKind::MissingName, "@keyframes missing name");
        };
        let name = name[1].to_string();

        if self.cursor.match_pattern(patterns::open_brace()).is_none() {
            return self
                .cursor
                .fail(ErrorKind::Structural, "@keyframes missing '{'");
        }
        try_rule!(self.comments());

        let mut children = Vec::new();
        while let Parse::Matched(id) = try_rule!(self.keyframe()) {
            children.push(id);
            self.cursor.skip_whitespace();
            try_rule!(self.comments());
            self.cursor.skip_whitespace();
        }

        if self.cursor.match_pattern(patterns::close_brace()).is_none() {
            return self
                .cursor
                .fail(ErrorKind::Structural, "@keyframes missing '}'");
        }

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::keyframes(
            name, vendor, children, position,
        ))))
    }

    /// One keyframe entry: comma-separated `from`/`to`/percentage keys and a
    /// declaration block. `from` and `to` normalize to `0%` and `100%`.
    fn keyframe(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();

        let mut keys: Vec<String> = Vec::new();
        while let Some(caps) = self.cursor.match_pattern(patterns::keyframe_selector()) {
            let key = match &caps[1] {
                "from" => "0%",
                "to" => "100%",
                other => other,
            };
            keys.push(key.to_string());
            let _ = self.cursor.match_pattern(patterns::comma());
        }
        if keys.is_empty() {
            return Ok(Parse::Absent);
        }

        let Parse::Matched(style) = try_rule!(self.declaration_block("keyframe ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::keyframe(
            keys.join(", "),
            style,
            position,
        ))))
    }

    /// `@media <query-list> { <rules> }`
    fn at_media(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_media()) else {
            return Ok(Parse::Absent);
        };
        let condition_text = caps[1].trim().to_string();
        let media = MediaList::from_text(&caps[1]);

        let Parse::Matched(children) = try_rule!(self.rule_list("@media ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::media(
            media,
            condition_text,
            children,
            position,
        ))))
    }

    /// `@supports <condition> { <rules> }`
    fn at_supports(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_supports()) else {
            return Ok(Parse::Absent);
        };
        let condition_text = caps[1].trim().to_string();

        let Parse::Matched(children) = try_rule!(self.rule_list("@supports ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::supports(
            condition_text,
            children,
            position,
        ))))
    }

    /// `@document <matcher-list> { <rules> }`, with an optional vendor infix.
    fn at_document(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_document()) else {
            return Ok(Parse::Absent);
        };
        let vendor = caps.get(1).map(|m| m.as_str().to_string());
        let condition_text = caps[2].trim().to_string();

        let Parse::Matched(children) = try_rule!(self.rule_list("@document ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::document(
            condition_text,
            vendor,
            children,
            position,
        ))))
    }

    /// `@host { <rules> }`
    fn at_host(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        if self.cursor.match_pattern(patterns::at_host()).is_none() {
            return Ok(Parse::Absent);
        }

        let Parse::Matched(children) = try_rule!(self.rule_list("@host ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::host(children, position))))
    }

    // =========================================================================
    // Declaration-block at-rules
    // =========================================================================

    /// `@font-face { <declarations> }`
    fn at_font_face(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        if self.cursor.match_pattern(patterns::at_font_face()).is_none() {
            return Ok(Parse::Absent);
        }

        let Parse::Matched(style) = try_rule!(self.declaration_block("@font-face ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::font_face(style, position))))
    }

    /// `@page <selector>? { <declarations> }` — the selector is optional.
    fn at_page(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        if self.cursor.match_pattern(patterns::at_page()).is_none() {
            return Ok(Parse::Absent);
        }

        let selectors = match try_rule!(self.selector_list()) {
            Parse::Matched(selectors) => selectors,
            _ => Vec::new(),
        };

        let Parse::Matched(style) = try_rule!(self.declaration_block("@page ")) else {
            return Ok(Parse::Failed);
        };

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::page(
            selectors.join(", "),
            style,
            position,
        ))))
    }

    // =========================================================================
    // Statement at-rules
    // =========================================================================

    /// `@import <operand> <media>? ;`
    fn at_import(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_import()) else {
            return Ok(Parse::Absent);
        };
        let statement = caps[0].to_string();
        let href = first_operand(&caps, 1..=5);
        let media = MediaList::from_text(caps.get(6).map_or("", |m| m.as_str()));

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::import(
            statement, href, media, position,
        ))))
    }

    /// `@namespace <prefix>? <operand> ;`
    fn at_namespace(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_namespace()) else {
            return Ok(Parse::Absent);
        };
        let statement = caps[0].to_string();
        let prefix = caps.get(1).map(|m| m.as_str().to_string());
        let namespace_uri = first_operand(&caps, 2..=6);

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::namespace(
            statement,
            namespace_uri,
            prefix,
            position,
        ))))
    }

    /// `@custom-media --name <query> ;`
    fn at_custom_media(&mut self) -> ParseResult<RuleId> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_custom_media()) else {
            return Ok(Parse::Absent);
        };
        let name = caps[1].trim().to_string();
        let media = MediaList::from_text(&caps[2]);

        let position = self.cursor.span(mark);
        Ok(Parse::Matched(self.push(Rule::custom_media(
            name, media, position,
        ))))
    }

    /// `@charset "<encoding>" ;` — records the encoding (every occurrence
    /// overwrites the previous one) and produces no tree node.
    fn at_charset(&mut self) -> ParseResult<()> {
        let mark = self.cursor.mark();
        let Some(caps) = self.cursor.match_pattern(patterns::at_charset()) else {
            return Ok(Parse::Absent);
        };
        let encoding = caps[1]
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        self.encoding = Some(encoding);

        let _ = self.cursor.span(mark);
        Ok(Parse::Matched(()))
    }
}
