//! Node selectors
//!
//! A [`Selector`] is a predicate over nodes. Closures are selectors, and
//! [`CodeBlockSelector`] is the standard matcher for executable code blocks.

use crate::node::{tags, Node};

/// Attribute marking a code block as executable
pub const EXEC_ATTR: &str = "exec";

/// Attribute carrying a code block's language
pub const LANG_ATTR: &str = "lang";

/// Predicate over document nodes
pub trait Selector: Send + Sync {
    /// Check whether the node is selected
    fn matches(&self, node: &Node) -> bool;
}

impl<F> Selector for F
where
    F: Fn(&Node) -> bool + Send + Sync,
{
    fn matches(&self, node: &Node) -> bool {
        self(node)
    }
}

/// Matches executable code blocks
///
/// A node matches when it is a `code` node carrying an `exec` attribute
/// whose value is not `false`, and, if a language filter is set, whose
/// `lang` attribute equals it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlockSelector {
    language: Option<String>,
}

impl CodeBlockSelector {
    /// Match executable code blocks of any language
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match executable code blocks of one language
    #[inline]
    #[must_use]
    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
        }
    }

    /// Language filter, if any
    #[inline]
    #[must_use]
    pub fn language_filter(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl Selector for CodeBlockSelector {
    fn matches(&self, node: &Node) -> bool {
        if !node.is(tags::CODE) {
            return false;
        }
        let executable = node.attr(EXEC_ATTR).is_some_and(|v| v != "false");
        let language_ok = match &self.language {
            Some(lang) => node.attr(LANG_ATTR) == Some(lang.as_str()),
            None => true,
        };
        executable && language_ok
    }
}
