//! Knit Core
//!
//! Turns a document with executable fragments into a document with their
//! results. The [`Rewriter`] selects fragment nodes, names each one's group,
//! runs everything through a shared [`CacheStore`](knit_exec::CacheStore)
//! and replaces every fragment with a cell:
//!
//! ```text
//! Document ─select─→ [Fragment] ─CacheStore::run─→ [FragmentOutcome] ─render─→ cells ─replace─→ Document
//! ```
//!
//! Failing fragments are rendered and returned as [`EvaluationWarning`]s;
//! cancellation aborts the rewrite with [`RewriteError::Cancelled`].

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod render;
pub mod rewriter;

pub use config::{FragmentOptions, GroupNaming, RewriteConfig, Settings};
pub use error::{Result, RewriteError};
pub use rewriter::{reset, EvaluationWarning, Rewriter, Rewritten};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for rewriting documents
    pub use crate::config::{RewriteConfig, Settings};
    pub use crate::error::RewriteError;
    pub use crate::rewriter::{reset, Rewriter, Rewritten};
    pub use knit_exec::CacheStore;
}
