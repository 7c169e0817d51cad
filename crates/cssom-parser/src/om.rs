//! The CSS object model produced by a parse.
//!
//! Rules live in a flat arena owned by the [`StyleSheet`]; child lists and
//! parent back-references are [`RuleId`] handles into it. Nodes are built
//! bottom-up during the parse with `parent_rule` unset, and one linking
//! pass fills the back-references in once the whole tree exists, so no
//! ownership cycle is ever constructed.

use serde::Serialize;

use cssom_scan::{OwnerHandle, ParseError, Position};

/// Handle to a rule in its stylesheet's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleId(pub(crate) usize);

/// An ordered list of media queries, split and normalized once at
/// construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MediaList {
    queries: Vec<String>,
}

impl MediaList {
    /// Split `text` on commas, trim each query, and normalize `a:b` to
    /// `a: b`. Empty or all-whitespace text yields an empty list.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }
        let queries = text
            .split(',')
            .map(|query| {
                query
                    .trim()
                    .split(':')
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect();
        Self { queries }
    }

    pub fn media_text(&self) -> String {
        self.queries.join(", ")
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Bounds-checked lookup by index.
    pub fn item(&self, index: usize) -> Option<&str> {
        self.queries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }
}

/// One `property: value` declaration. Duplicate properties are retained in
/// source order; last-wins resolution belongs to a later cascade stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub position: Position,
}

/// An ordered declaration block (the `style` of style-bearing rules).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    declarations: Vec<Declaration>,
    css_text: String,
}

impl Style {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        let css_text = declarations
            .iter()
            .map(|decl| format!("{}: {}", decl.property, decl.value))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            declarations,
            css_text,
        }
    }

    /// The declarations in source order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn css_text(&self) -> &str {
        &self.css_text
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Bounds-checked lookup by index.
    pub fn item(&self, index: usize) -> Option<&Declaration> {
        self.declarations.get(index)
    }

    /// Last declared value for `property`, the lookup the cascade wants.
    /// Kept separate from the ordered sequence so order stays intact.
    pub fn value_of(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value.as_str())
    }
}

/// The per-kind payload of a rule node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RuleKind {
    Style {
        selector_text: String,
        style: Style,
    },
    Media {
        media: MediaList,
        condition_text: String,
        children: Vec<RuleId>,
    },
    Supports {
        condition_text: String,
        children: Vec<RuleId>,
    },
    Keyframes {
        name: String,
        vendor: Option<String>,
        children: Vec<RuleId>,
    },
    Keyframe {
        key_text: String,
        style: Style,
    },
    FontFace {
        style: Style,
    },
    Page {
        selector_text: String,
        style: Style,
    },
    Document {
        condition_text: String,
        vendor: Option<String>,
        children: Vec<RuleId>,
    },
    Host {
        children: Vec<RuleId>,
    },
    Import {
        href: String,
        media: MediaList,
    },
    Namespace {
        namespace_uri: String,
        prefix: Option<String>,
    },
    CustomMedia {
        name: String,
        media: MediaList,
    },
}

impl RuleKind {
    /// The kind discriminant as a stable lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Style { .. } => "style",
            RuleKind::Media { .. } => "media",
            RuleKind::Supports { .. } => "supports",
            RuleKind::Keyframes { .. } => "keyframes",
            RuleKind::Keyframe { .. } => "keyframe",
            RuleKind::FontFace { .. } => "font-face",
            RuleKind::Page { .. } => "page",
            RuleKind::Document { .. } => "document",
            RuleKind::Host { .. } => "host",
            RuleKind::Import { .. } => "import",
            RuleKind::Namespace { .. } => "namespace",
            RuleKind::CustomMedia { .. } => "custom-media",
        }
    }

    /// Nested rule ids for container kinds, empty for leaves.
    pub fn children(&self) -> &[RuleId] {
        match self {
            RuleKind::Media { children, .. }
            | RuleKind::Supports { children, .. }
            | RuleKind::Keyframes { children, .. }
            | RuleKind::Document { children, .. }
            | RuleKind::Host { children } => children,
            _ => &[],
        }
    }
}

/// A parsed rule: kind payload, shallow `css_text`, source span, and the
/// parent back-reference filled in by the linking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub kind: RuleKind,
    /// Single-level reconstruction from already-parsed fields. Nested rule
    /// bodies are not serialized into it.
    pub css_text: String,
    pub position: Position,
    /// Nearest enclosing rule; `None` for top-level rules. Set only after
    /// the full tree exists.
    pub parent_rule: Option<RuleId>,
}

impl Rule {
    fn new(kind: RuleKind, css_text: String, position: Position) -> Self {
        Self {
            kind,
            css_text,
            position,
            parent_rule: None,
        }
    }

    pub(crate) fn style_rule(selector_text: String, style: Style, position: Position) -> Self {
        let css_text = format!("{} {{ {} }}", selector_text, style.css_text());
        Self::new(
            RuleKind::Style {
                selector_text,
                style,
            },
            css_text,
            position,
        )
    }

    pub(crate) fn media(
        media: MediaList,
        condition_text: String,
        children: Vec<RuleId>,
        position: Position,
    ) -> Self {
        let css_text = format!("@media {} {{  }}", media.media_text());
        Self::new(
            RuleKind::Media {
                media,
                condition_text,
                children,
            },
            css_text,
            position,
        )
    }

    pub(crate) fn supports(
        condition_text: String,
        children: Vec<RuleId>,
        position: Position,
    ) -> Self {
        let css_text = format!("@supports {condition_text} {{  }}");
        Self::new(
            RuleKind::Supports {
                condition_text,
                children,
            },
            css_text,
            position,
        )
    }

    pub(crate) fn keyframes(
        name: String,
        vendor: Option<String>,
        children: Vec<RuleId>,
        position: Position,
    ) -> Self {
        let css_text = format!("@keyframes {name} {{  }}");
        Self::new(
            RuleKind::Keyframes {
                name,
                vendor,
                children,
            },
            css_text,
            position,
        )
    }

    pub(crate) fn keyframe(key_text: String, style: Style, position: Position) -> Self {
        let css_text = format!("{} {{ {} }}", key_text, style.css_text());
        Self::new(RuleKind::Keyframe { key_text, style }, css_text, position)
    }

    pub(crate) fn font_face(style: Style, position: Position) -> Self {
        let css_text = format!("@font-face {{ {} }}", style.css_text());
        Self::new(RuleKind::FontFace { style }, css_text, position)
    }

    pub(crate) fn page(selector_text: String, style: Style, position: Position) -> Self {
        let css_text = format!("@page {} {{ {} }}", selector_text, style.css_text());
        Self::new(
            RuleKind::Page {
                selector_text,
                style,
            },
            css_text,
            position,
        )
    }

    pub(crate) fn document(
        condition_text: String,
        vendor: Option<String>,
        children: Vec<RuleId>,
        position: Position,
    ) -> Self {
        let css_text = format!("@document {condition_text} {{  }}");
        Self::new(
            RuleKind::Document {
                condition_text,
                vendor,
                children,
            },
            css_text,
            position,
        )
    }

    pub(crate) fn host(children: Vec<RuleId>, position: Position) -> Self {
        Self::new(RuleKind::Host { children }, "@host {  }".into(), position)
    }

    pub(crate) fn import(
        statement: String,
        href: String,
        media: MediaList,
        position: Position,
    ) -> Self {
        Self::new(RuleKind::Import { href, media }, statement, position)
    }

    pub(crate) fn namespace(
        statement: String,
        namespace_uri: String,
        prefix: Option<String>,
        position: Position,
    ) -> Self {
        Self::new(
            RuleKind::Namespace {
                namespace_uri,
                prefix,
            },
            statement,
            position,
        )
    }

    pub(crate) fn custom_media(name: String, media: MediaList, position: Position) -> Self {
        let css_text = format!("@custom-media {} {}", name, media.media_text());
        Self::new(RuleKind::CustomMedia { name, media }, css_text, position)
    }
}

/// The root of a parsed stylesheet. Owns every rule node; all
/// `parent_rule` handles resolve against it, and it is the
/// parent stylesheet of every rule it contains.
#[derive(Debug, Serialize)]
pub struct StyleSheet {
    pub(crate) media: MediaList,
    pub(crate) css_rules: Vec<RuleId>,
    pub(crate) owner: Option<OwnerHandle>,
    pub(crate) disabled: bool,
    /// Encoding recorded from `@charset` statements; every occurrence
    /// overwrites the previous one. Charset nodes never appear in the tree.
    pub(crate) encoding: Option<String>,
    /// Errors accumulated in silent mode, in the order they were raised.
    pub(crate) errors: Vec<ParseError>,
    #[serde(rename = "rules")]
    pub(crate) arena: Vec<Rule>,
}

impl StyleSheet {
    /// MIME type of the sheet.
    pub fn content_type(&self) -> &'static str {
        "text/css"
    }

    /// The stylesheet-level media list (always empty for a parsed sheet).
    pub fn media(&self) -> &MediaList {
        &self.media
    }

    /// Top-level rule handles, in source order.
    pub fn css_rules(&self) -> &[RuleId] {
        &self.css_rules
    }

    /// Bounds-checked arena lookup.
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.arena.get(id.0)
    }

    /// The nearest enclosing rule of `id`, if it has one.
    pub fn parent_rule(&self, id: RuleId) -> Option<&Rule> {
        self.rule(id)?.parent_rule.and_then(|parent| self.rule(parent))
    }

    /// Iterate the top-level rules in source order.
    pub fn top_level(&self) -> impl Iterator<Item = &Rule> {
        self.css_rules.iter().filter_map(|id| self.rule(*id))
    }

    /// Every rule in the sheet, containers and descendants alike.
    pub fn all_rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.arena.iter().enumerate().map(|(i, rule)| (RuleId(i), rule))
    }

    pub fn owner(&self) -> Option<OwnerHandle> {
        self.owner
    }

    /// Whether the embedding application has switched the sheet off. Starts
    /// false; parsing never sets it.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Depth-first pass stamping `parent_rule` onto every node. Runs once,
    /// after construction, because an enclosing rule's id does not exist
    /// while its children are being parsed.
    pub(crate) fn link_parents(&mut self) {
        let roots = self.css_rules.clone();
        for id in roots {
            self.link(id, None);
        }
    }

    fn link(&mut self, id: RuleId, parent: Option<RuleId>) {
        self.arena[id.0].parent_rule = parent;
        let children = self.arena[id.0].kind.children().to_vec();
        for child in children {
            self.link(child, Some(id));
        }
    }
}
