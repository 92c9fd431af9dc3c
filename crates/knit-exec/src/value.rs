//! Captured results
//!
//! What a fragment leaves behind besides its printed output: a plain value,
//! a richly renderable payload, or a captured failure. Renderers dispatch on
//! the variant.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Final value or failure of one fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CapturedResult {
    /// Plain value, rendered as text
    Value(serde_json::Value),
    /// Payload that renders itself (markup, image)
    Rich(RichValue),
    /// Captured failure, replayed on every cached run
    Failure(Failure),
}

impl CapturedResult {
    /// Check if this is a failure
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Failure, if this is one
    #[inline]
    #[must_use]
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl Display for CapturedResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Rich(rich) => f.write_str(&rich.data),
            Self::Failure(failure) => write!(f, "{failure}"),
        }
    }
}

/// Richly renderable payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichValue {
    /// MIME type of the payload
    pub mime: String,
    /// Payload; base64 for binary types
    pub data: String,
}

impl RichValue {
    /// Create rich value
    #[inline]
    #[must_use]
    pub fn new(mime: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// HTML markup
    #[inline]
    #[must_use]
    pub fn html(data: impl Into<String>) -> Self {
        Self::new("text/html", data)
    }

    /// SVG image
    #[inline]
    #[must_use]
    pub fn svg(data: impl Into<String>) -> Self {
        Self::new("image/svg+xml", data)
    }

    /// Markdown text
    #[inline]
    #[must_use]
    pub fn markdown(data: impl Into<String>) -> Self {
        Self::new("text/markdown", data)
    }

    /// Base64-encoded PNG image
    #[inline]
    #[must_use]
    pub fn png(base64: impl Into<String>) -> Self {
        Self::new("image/png", base64)
    }
}

/// Kind of captured failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Backend reported an error
    Error,
    /// Backend panicked
    Panic,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Panic => f.write_str("panic"),
        }
    }
}

/// Failure captured while evaluating a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Position of the failing fragment within its group
    pub position: usize,
    /// Failure kind
    pub kind: FailureKind,
    /// Underlying cause
    pub message: String,
}

impl Failure {
    /// Backend error at position
    #[inline]
    #[must_use]
    pub fn error(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            kind: FailureKind::Error,
            message: message.into(),
        }
    }

    /// Backend panic at position
    #[inline]
    #[must_use]
    pub fn panic(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            kind: FailureKind::Panic,
            message: message.into(),
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in fragment {}: {}",
            self.kind, self.position, self.message
        )
    }
}
