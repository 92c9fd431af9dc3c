//! Documents: a path plus a root node
//!
//! Selection walks the tree in pre-order (document order). A matching node
//! is collected as a whole and its subtree is not searched further, so
//! matches never nest and replacement is unambiguous.

use crate::error::DocumentError;
use crate::node::{tags, Node};
use crate::selector::Selector;
use std::path::{Path, PathBuf};

/// A document tree with its source path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    root: Node,
}

impl Document {
    /// Create document from path and root node
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, root: Node) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    /// Create document whose root holds the given top-level nodes
    #[inline]
    #[must_use]
    pub fn from_nodes(path: impl Into<PathBuf>, nodes: impl IntoIterator<Item = Node>) -> Self {
        Self::new(path, Node::new(tags::ROOT).with_children(nodes))
    }

    /// Document path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Collect matching nodes in document order
    #[must_use]
    pub fn select<S: Selector + ?Sized>(&self, selector: &S) -> Vec<&Node> {
        let mut out = Vec::new();
        collect(&self.root, selector, &mut out);
        out
    }

    /// Replace the n-th match with the n-th replacement
    ///
    /// Everything the selector does not match is carried over unchanged.
    ///
    /// # Errors
    /// - `DocumentError::ReplacementCount` if the number of replacements
    ///   differs from the number of matches
    pub fn replace<S: Selector + ?Sized>(
        &self,
        selector: &S,
        replacements: Vec<Node>,
    ) -> Result<Document, DocumentError> {
        let expected = self.select(selector).len();
        if expected != replacements.len() {
            return Err(DocumentError::ReplacementCount {
                expected,
                actual: replacements.len(),
            });
        }

        let mut replacements = replacements.into_iter();
        let root = rebuild(&self.root, selector, &mut replacements).ok_or(
            DocumentError::ReplacementCount {
                expected,
                actual: expected,
            },
        )?;
        tracing::trace!(path = %self.path.display(), replaced = expected, "document rewritten");

        Ok(Self {
            path: self.path.clone(),
            root,
        })
    }
}

fn collect<'a, S: Selector + ?Sized>(node: &'a Node, selector: &S, out: &mut Vec<&'a Node>) {
    if selector.matches(node) {
        out.push(node);
        return;
    }
    for child in node.children() {
        collect(child, selector, out);
    }
}

fn rebuild<S, I>(node: &Node, selector: &S, replacements: &mut I) -> Option<Node>
where
    S: Selector + ?Sized,
    I: Iterator<Item = Node>,
{
    if selector.matches(node) {
        return replacements.next();
    }

    let mut copy = node.clone();
    let children = copy.children_mut();
    for child in children.iter_mut() {
        *child = rebuild(child, selector, replacements)?;
    }
    Some(copy)
}
