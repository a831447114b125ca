// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot of a page's element tree.
//!
//! [`Element`] is the nested form pages produce; [`Document`] flattens it
//! into an arena so lookups can walk parents and descendants by [`NodeId`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index of a node inside one [`Document`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

fn rendered_default() -> bool {
    true
}

/// One element with its attributes, own text and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    /// Whether the element has a layout box.
    #[serde(default = "rendered_default")]
    pub rendered: bool,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            rendered: true,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.rendered = false;
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    rendered: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Flattened element tree in document (pre-)order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        let mut doc = Self { nodes: Vec::new() };
        doc.push(root, None);
        doc
    }

    fn push(&mut self, element: Element, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: element.tag,
            attrs: element.attrs,
            text: element.text,
            rendered: element.rendered,
            parent,
            children: Vec::new(),
        });
        for child in element.children {
            let child_id = self.push(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in document order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    ///
    /// Pre-order numbering makes a subtree a contiguous id range.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let end = self.subtree_end(id);
        (id.0 + 1..end).map(NodeId)
    }

    fn subtree_end(&self, id: NodeId) -> usize {
        let mut current = id;
        loop {
            match self.nodes[current.0].children.last() {
                Some(last) => current = *last,
                None => return current.0 + 1,
            }
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .map(|n| self.nodes[n.0].text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rendered itself and inside rendered ancestors.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.nodes[node.0].rendered {
                return false;
            }
            current = self.nodes[node.0].parent;
        }
        true
    }

    pub fn select_all<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = NodeId> + 'a {
        self.ids().filter(move |id| selector.matches(self, *id))
    }

    /// First visible node matching `selector`.
    pub fn select_visible(&self, selector: &Selector) -> Option<NodeId> {
        self.select_all(selector).find(|id| self.is_visible(*id))
    }
}

/// How an attribute value is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMatch {
    Present,
    Equals(&'static str),
    /// Case-insensitive substring.
    Contains(&'static str),
    /// Whitespace-separated token, as in `class`.
    Token(&'static str),
}

/// A tag and/or one attribute condition; enough for the lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub attr: Option<(&'static str, AttrMatch)>,
}

impl Selector {
    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag: Some(tag),
            attr: None,
        }
    }

    pub const fn any() -> Self {
        Self {
            tag: None,
            attr: None,
        }
    }

    pub const fn with_attr(mut self, name: &'static str, matcher: AttrMatch) -> Self {
        self.attr = Some((name, matcher));
        self
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        if let Some(tag) = self.tag {
            if doc.tag(id) != tag {
                return false;
            }
        }
        match self.attr {
            None => true,
            Some((name, matcher)) => match (doc.attr(id, name), matcher) {
                (None, _) => false,
                (Some(_), AttrMatch::Present) => true,
                (Some(value), AttrMatch::Equals(expected)) => value == expected,
                (Some(value), AttrMatch::Contains(needle)) => value
                    .to_ascii_lowercase()
                    .contains(&needle.to_ascii_lowercase()),
                (Some(value), AttrMatch::Token(token)) => {
                    value.split_whitespace().any(|t| t == token)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(
            Element::new("main")
                .child(
                    Element::new("section")
                        .attr("class", "top-card hero")
                        .child(Element::new("img").attr("alt", "Profile Photo"))
                        .child(Element::new("button").text("  Edit   photo ")),
                )
                .child(
                    Element::new("div")
                        .hidden()
                        .child(Element::new("button").text("Save")),
                ),
        )
    }

    #[test]
    fn flattening_is_pre_order() {
        let doc = sample();
        let tags: Vec<&str> = doc.ids().map(|id| doc.tag(id)).collect();
        assert_eq!(tags, ["main", "section", "img", "button", "div", "button"]);
        assert_eq!(doc.parent(NodeId(3)), Some(NodeId(1)));
        assert_eq!(doc.children(NodeId(0)), &[NodeId(1), NodeId(4)]);
    }

    #[test]
    fn descendants_cover_exact_subtree() {
        let doc = sample();
        let section: Vec<NodeId> = doc.descendants(NodeId(1)).collect();
        assert_eq!(section, [NodeId(2), NodeId(3)]);
        assert_eq!(doc.descendants(NodeId(0)).count(), 5);
        assert_eq!(doc.descendants(NodeId(5)).count(), 0);
    }

    #[test]
    fn visibility_inherits_from_ancestors() {
        let doc = sample();
        assert!(doc.is_visible(NodeId(3)));
        assert!(!doc.is_visible(NodeId(5)));
    }

    #[test]
    fn selectors_match_tag_and_attributes() {
        let doc = sample();
        let photo = Selector::tag("img").with_attr("alt", AttrMatch::Contains("profile photo"));
        assert_eq!(doc.select_visible(&photo), Some(NodeId(2)));
        let hero = Selector::any().with_attr("class", AttrMatch::Token("hero"));
        assert_eq!(doc.select_all(&hero).collect::<Vec<_>>(), [NodeId(1)]);
        let buttons = Selector::tag("button");
        assert_eq!(doc.select_all(&buttons).count(), 2);
        assert_eq!(doc.select_visible(&buttons), Some(NodeId(3)));
    }

    #[test]
    fn text_content_joins_trimmed_fragments() {
        let doc = sample();
        assert_eq!(doc.text_content(NodeId(1)), "Edit   photo");
    }

    #[test]
    fn elements_deserialize_with_defaults() {
        let el: Element = serde_json::from_str(r#"{"tag": "button", "text": "Save"}"#).unwrap();
        assert!(el.rendered);
        assert!(el.children.is_empty());
    }
}
