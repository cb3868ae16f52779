// crates/mailbeacon-compose/src/body.rs
// ============================================================================
// Module: Message Body Model
// Description: Element/text tree for a composed message body.
// Purpose: Give the injector a structural view of the body it rewrites.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`MessageBody`] is the editable root element of a compose surface. Hosts
//! translate their live document into this tree and back; the injector only
//! ever edits the tree. Attribute order is preserved so rendering is stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tag name of the body root.
const ROOT_TAG: &str = "div";
/// Elements rendered without a closing tag.
const VOID_TAGS: [&str; 6] = ["br", "hr", "img", "input", "meta", "wbr"];

// ============================================================================
// SECTION: Nodes
// ============================================================================

/// A node in the body tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyNode {
    /// Element node.
    Element(Element),
    /// Text node.
    Text(String),
}

impl BodyNode {
    /// Creates a text node.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the element when this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Returns true for text nodes.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<Element> for BodyNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    tag: String,
    /// Attributes in insertion order.
    attributes: Vec<(String, String)>,
    /// Child nodes.
    children: Vec<BodyNode>,
}

impl Element {
    /// Creates an element with no attributes or children.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`Element::push`].
    #[must_use]
    pub fn with_child(mut self, child: impl Into<BodyNode>) -> Self {
        self.push(child);
        self
    }

    /// Returns the tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns true when the attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Sets an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.attributes.push((name.to_ascii_lowercase(), value));
        }
    }

    /// Returns the child nodes.
    #[must_use]
    pub fn children(&self) -> &[BodyNode] {
        &self.children
    }

    /// Appends a child node.
    pub fn push(&mut self, child: impl Into<BodyNode>) {
        self.children.push(child.into());
    }

    /// Inserts a child node at `index`, appending when out of range.
    pub fn insert(&mut self, index: usize, child: impl Into<BodyNode>) {
        let index = index.min(self.children.len());
        self.children.insert(index, child.into());
    }

    /// Visits this element and every descendant element, depth first.
    pub fn visit(&self, visitor: &mut dyn FnMut(&Self)) {
        visitor(self);
        for child in &self.children {
            if let BodyNode::Element(element) = child {
                element.visit(visitor);
            }
        }
    }

    /// Mutable form of [`Element::visit`].
    pub fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut Self)) {
        visitor(self);
        for child in &mut self.children {
            if let BodyNode::Element(element) = child {
                element.visit_mut(visitor);
            }
        }
    }

    /// Concatenated text content of this element.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Renders this element as HTML.
    fn render(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value, true));
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }
        for child in &self.children {
            match child {
                BodyNode::Element(element) => element.render(out),
                BodyNode::Text(text) => out.push_str(&escape(text, false)),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

// ============================================================================
// SECTION: Message Body
// ============================================================================

/// Editable body of one compose surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    /// Root element holding the body content.
    root: Element,
}

impl Default for MessageBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBody {
    /// Creates an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Element::new(ROOT_TAG).with_attr("contenteditable", "true"),
        }
    }

    /// Creates a body from top-level nodes.
    #[must_use]
    pub fn from_nodes(nodes: impl IntoIterator<Item = BodyNode>) -> Self {
        let mut body = Self::new();
        for node in nodes {
            body.root.push(node);
        }
        body
    }

    /// Returns the root element.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Returns the root element mutably.
    pub const fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Counts elements matching a predicate, anywhere in the body.
    #[must_use]
    pub fn count_elements(&self, predicate: impl Fn(&Element) -> bool) -> usize {
        let mut count = 0;
        self.root.visit(&mut |element| {
            if predicate(element) {
                count += 1;
            }
        });
        count
    }

    /// Collects clones of every element with the given tag.
    #[must_use]
    pub fn elements_by_tag(&self, tag: &str) -> Vec<Element> {
        let mut found = Vec::new();
        self.root.visit(&mut |element| {
            if element.tag().eq_ignore_ascii_case(tag) {
                found.push(element.clone());
            }
        });
        found
    }

    /// Renders the body content (without the root wrapper) as HTML.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        for child in self.root.children() {
            match child {
                BodyNode::Element(element) => element.render(&mut out),
                BodyNode::Text(text) => out.push_str(&escape(text, false)),
            }
        }
        out
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends text content of nodes to `out`.
fn collect_text(nodes: &[BodyNode], out: &mut String) {
    for node in nodes {
        match node {
            BodyNode::Text(text) => out.push_str(text),
            BodyNode::Element(element) => collect_text(element.children(), out),
        }
    }
}

/// Escapes HTML text or attribute content.
fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
