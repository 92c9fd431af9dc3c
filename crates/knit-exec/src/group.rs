//! Group identifiers
//!
//! A [`GroupId`] scopes one evaluation context. It pairs the document the
//! fragments come from with a group name, so equal group names in different
//! documents never share state.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identifier of one isolated evaluation group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId {
    document: String,
    name: String,
}

impl GroupId {
    /// Create group id from document identifier and group name
    #[inline]
    #[must_use]
    pub fn new(document: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            name: name.into(),
        }
    }

    /// Document identifier
    #[inline]
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Group name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.name)
    }
}
