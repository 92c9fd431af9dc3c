//! Error types for the rewriter
//!
//! Evaluation failures are not errors here: they are captured per fragment
//! and surfaced as [`EvaluationWarning`](crate::EvaluationWarning)s. What
//! remains is configuration problems, cancellation and document I/O.

use knit_document::DocumentError;
use knit_exec::Cancelled;
use std::path::PathBuf;

/// Main rewriter error type
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// Malformed rewriter configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed per-fragment option
    #[error("invalid value '{value}' for option '{option}' on fragment {index} of {document}")]
    InvalidOption {
        /// Document path
        document: PathBuf,
        /// Index of the fragment among the document's selected fragments
        index: usize,
        /// Attribute name
        option: String,
        /// Offending value
        value: String,
    },

    /// Evaluation was cancelled; the rewrite produced no document
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Document tree or file error
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Settings file does not parse
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// Settings file could not be read
    #[error("failed to read settings from {path}: {source}")]
    Io {
        /// Settings file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl RewriteError {
    /// Create configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if the rewrite was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Result type for rewriter operations
pub type Result<T> = std::result::Result<T, RewriteError>;
