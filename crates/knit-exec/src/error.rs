//! Error types for the execution layer
//!
//! Two kinds of trouble leave a backend:
//! - [`EvalFault::Failed`]: the fragment raised an error. It is captured as a
//!   failure result and cached like any other result.
//! - [`EvalFault::Cancelled`]: an external abort. It is never captured; it
//!   surfaces as [`Cancelled`] and ends the whole run.

use crate::group::GroupId;

/// Boxed error raised by a backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fault reported by an evaluation backend
#[derive(Debug, thiserror::Error)]
pub enum EvalFault {
    /// Fragment raised an error
    #[error("{0}")]
    Failed(BoxError),

    /// Evaluation was aborted from outside
    #[error("evaluation cancelled")]
    Cancelled,
}

impl EvalFault {
    /// Create failure from any error or message
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }

    /// Check if this fault is a cancellation
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A run was cancelled while evaluating a fragment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("evaluation of group {group} cancelled at fragment {position}")]
pub struct Cancelled {
    /// Group being evaluated
    pub group: GroupId,
    /// Position of the interrupted fragment within its group
    pub position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_wraps_messages() {
        let fault = EvalFault::failed("name 'x' is not defined");
        assert_eq!(fault.to_string(), "name 'x' is not defined");
        assert!(!fault.is_cancelled());
    }

    #[test]
    fn cancelled_display() {
        let err = Cancelled {
            group: GroupId::new("doc.md", "main"),
            position: 3,
        };
        assert_eq!(
            err.to_string(),
            "evaluation of group doc.md#main cancelled at fragment 3"
        );
        assert!(EvalFault::Cancelled.is_cancelled());
    }
}
