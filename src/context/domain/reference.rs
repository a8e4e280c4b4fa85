//! Context references linking tasks to workspace documents, messages, and
//! links.

use super::{ContextDomainError, ParseContextRefTypeError};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of workspace item a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRefType {
    /// A workspace document.
    Document,
    /// A chat message.
    Message,
    /// A saved link.
    Link,
}

impl ContextRefType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Message => "message",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for ContextRefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ContextRefType {
    type Error = ParseContextRefTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "message" => Ok(Self::Message),
            "link" => Ok(Self::Link),
            _ => Err(ParseContextRefTypeError(value.to_owned())),
        }
    }
}

/// Identifier of the referenced item within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextRefId(String);

impl ContextRefId {
    /// Creates a validated reference identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::EmptyRefId`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, ContextDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ContextDomainError::EmptyRefId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextRefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplication key of a context item: `(refType, refId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextKey {
    /// Kind of item.
    pub ref_type: ContextRefType,
    /// Item identifier.
    pub ref_id: ContextRefId,
}

impl ContextKey {
    /// Creates a key from validated parts.
    #[must_use]
    pub const fn new(ref_type: ContextRefType, ref_id: ContextRefId) -> Self {
        Self { ref_type, ref_id }
    }

    /// Creates a key from raw values.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::EmptyRefId`] when `ref_id` is blank.
    pub fn from_parts(
        ref_type: ContextRefType,
        ref_id: impl Into<String>,
    ) -> Result<Self, ContextDomainError> {
        Ok(Self::new(ref_type, ContextRefId::new(ref_id)?))
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ref_type, self.ref_id)
    }
}

/// How a reference came to be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceOrigin {
    /// Picked by a user.
    Manual,
    /// Accepted from the ranked suggestions.
    Suggested,
}

/// Link from a task to a workspace item. Never mutated, only added or
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextReference {
    task_id: TaskId,
    key: ContextKey,
    origin: ReferenceOrigin,
    added_at: DateTime<Utc>,
}

impl ContextReference {
    /// Creates a reference stamped with the current time.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        key: ContextKey,
        origin: ReferenceOrigin,
        clock: &impl Clock,
    ) -> Self {
        Self {
            task_id,
            key,
            origin,
            added_at: clock.utc(),
        }
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the `(refType, refId)` key.
    #[must_use]
    pub const fn key(&self) -> &ContextKey {
        &self.key
    }

    /// Returns how the reference was attached.
    #[must_use]
    pub const fn origin(&self) -> ReferenceOrigin {
        self.origin
    }

    /// Returns when the reference was attached.
    #[must_use]
    pub const fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}
