//! Knit Execution Layer
//!
//! Evaluates ordered code fragments against per-group evaluation contexts and
//! caches what they printed and produced, so that a later run only
//! re-executes the changed suffix of each group.
//!
//! # Core Operations
//!
//! - **Evaluate**: run one fragment through an [`EvaluationBackend`],
//!   capturing output and turning failures into [`CapturedResult::Failure`]
//! - **Re-run**: reuse the unchanged prefix of an [`ExecutionCache`] and
//!   evaluate everything from the first changed fragment on
//! - **Dispatch**: split a flat fragment list by [`GroupId`], run each group
//!   against its own cache, and return outcomes in input order
//!
//! # Architecture
//!
//! ```text
//! [Fragment] → CacheStore::run ─lock─→ dispatch → ExecutionCache (per group) → Evaluator → Backend
//!                                         ↓
//!                              [FragmentOutcome] (input order)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use knit_exec::{CacheStore, Fragment, GroupId};
//!
//! let store = CacheStore::new();
//! let group = GroupId::new("notes.md", "main");
//! let run = store.run(&backend, &[Fragment::new(group, "1 + 1")])?;
//! assert_eq!(run.outcomes[0].result.as_ref().unwrap().to_string(), "2");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod store;
pub mod value;

pub use cache::{CachedCell, ExecutionCache, RerunStats};
pub use dispatch::{Dispatched, Fragment, FragmentOutcome, GroupSummary};
pub use error::{Cancelled, EvalFault};
pub use evaluator::{
    panic_message, strip_ansi, Evaluation, EvaluationBackend, Evaluator, Produced,
};
pub use group::GroupId;
pub use store::{CacheStore, StoreStats};
pub use value::{CapturedResult, Failure, FailureKind, RichValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the execution layer
    pub use crate::cache::{CachedCell, ExecutionCache, RerunStats};
    pub use crate::dispatch::{Dispatched, Fragment, FragmentOutcome};
    pub use crate::error::{Cancelled, EvalFault};
    pub use crate::evaluator::{EvaluationBackend, Produced};
    pub use crate::group::GroupId;
    pub use crate::store::CacheStore;
    pub use crate::value::{CapturedResult, Failure, RichValue};
}
