//! Error types for the document tree

use std::path::PathBuf;

/// Errors raised by document operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Replacement list does not line up with the selector's matches
    #[error("replacement count mismatch: selector matched {expected} nodes, got {actual} replacements")]
    ReplacementCount {
        /// Number of nodes the selector matched
        expected: usize,
        /// Number of replacement nodes supplied
        actual: usize,
    },

    /// IO error while reading or writing a document
    #[error("io error on {path}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
