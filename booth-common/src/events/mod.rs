//! Event types for the booth event fabrics
//!
//! Two independent fabrics share one vocabulary built on [`GroupId`]:
//! - The Fan-Out Hub (WebSocket, server ↔ viewers): [`HubEvent`]
//! - Cross-Tab Sync (same-origin peers): [`SyncMessage`]

mod hub_types;
mod sync_types;

pub use hub_types::HubEvent;
pub use sync_types::SyncMessage;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Opaque, globally unique token naming a group's storage directory
///
/// A group identifier is used verbatim as a directory name, so it must be a
/// single non-empty path component: no separators, no `.`/`..`, no NUL, and
/// not hidden (leading `.`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Validate and wrap a group identifier
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::InvalidInput("group id is empty".to_string()));
        }
        if raw.starts_with('.') {
            return Err(Error::InvalidInput(format!(
                "group id must not start with '.': {raw:?}"
            )));
        }
        if raw.chars().any(|c| c == '/' || c == '\\' || c == '\0') {
            return Err(Error::InvalidInput(format!(
                "group id must be a single path component: {raw:?}"
            )));
        }
        Ok(Self(raw))
    }

    /// Fresh identifier for a newly created group
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GroupId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
