//! Tagged tree nodes
//!
//! A [`Node`] carries a tag, ordered string attributes, its own text and an
//! ordered list of children. Nodes are plain values: rewriting a document
//! builds new nodes rather than mutating shared ones.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known node tags
pub mod tags {
    /// Document root
    pub const ROOT: &str = "document";
    /// Verbatim source text that the pipeline never interprets
    pub const RAW: &str = "raw";
    /// Code block (fenced block in markdown)
    pub const CODE: &str = "code";
    /// Rendered fragment: wraps input, output and result
    pub const CELL: &str = "cell";
    /// Original fragment inside a cell
    pub const INPUT: &str = "input";
    /// Captured side-effect output inside a cell
    pub const OUTPUT: &str = "output";
    /// Captured result inside a cell
    pub const RESULT: &str = "result";
}

/// Well-known attribute names on rendered nodes
pub mod attrs {
    /// Kind of a `result` node: one of [`VALUE`], [`RICH`], [`ERROR`]
    pub const KIND: &str = "kind";
    /// MIME type of a rich `result` node
    pub const MIME: &str = "mime";

    /// Plain value rendered as text
    pub const VALUE: &str = "value";
    /// Richly renderable payload embedded directly
    pub const RICH: &str = "rich";
    /// Captured evaluation failure
    pub const ERROR: &str = "error";
}

/// A node in a document tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    tag: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    attrs: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl Node {
    /// Create empty node with tag
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// With attribute (replaces an existing value, keeps its position)
    #[inline]
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// With text
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// With child appended
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// With children appended
    #[inline]
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Node tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Check node tag
    #[inline]
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Attribute lookup
    #[inline]
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// All attributes in insertion order
    #[inline]
    #[must_use]
    pub fn attrs(&self) -> &IndexMap<String, String> {
        &self.attrs
    }

    /// Own text of this node
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Child nodes
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Own text followed by the text of every descendant, pre-order
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }
}
