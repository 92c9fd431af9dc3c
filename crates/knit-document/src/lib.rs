//! Knit Document Tree
//!
//! The document boundary of the Knit pipeline: a small tree of tagged nodes,
//! selection in document order, and selector-driven replacement.
//!
//! # Core Operations
//!
//! - **Select**: collect nodes matching a [`Selector`] in document order
//! - **Replace**: substitute each match with a supplied node
//! - **Ingress/Egress**: read markdown into a [`Document`] and render it back
//!
//! # Example
//!
//! ```rust,ignore
//! use knit_document::{markdown, CodeBlockSelector};
//!
//! let doc = markdown::parse("notes.md", "```calc exec\n1 + 1\n```\n");
//! let blocks = doc.select(&CodeBlockSelector::new());
//! assert_eq!(blocks.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod markdown;
pub mod node;
pub mod selector;

pub use document::Document;
pub use error::DocumentError;
pub use node::{tags, Node};
pub use selector::{CodeBlockSelector, Selector};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Knit documents
    pub use crate::document::Document;
    pub use crate::error::DocumentError;
    pub use crate::node::{tags, Node};
    pub use crate::selector::{CodeBlockSelector, Selector};
}
