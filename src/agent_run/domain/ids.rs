//! Identifier types for the agent run domain.

use super::AgentRunDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an internal agent run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentRunId(Uuid);

impl AgentRunId {
    /// Creates a new random run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a run identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AgentRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for AgentRunId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AgentRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a run by the external coding-agent service.
///
/// The value is opaque to the lifecycle manager; only surrounding
/// whitespace is normalised away.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalRunId(String);

impl ExternalRunId {
    /// Maximum accepted length, matching the `external_run_id` column.
    const MAX_LENGTH: usize = 255;

    /// Creates a validated external run identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunDomainError::InvalidExternalRunId`] when the value
    /// is blank or longer than 255 bytes.
    pub fn new(value: impl Into<String>) -> Result<Self, AgentRunDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.len() > Self::MAX_LENGTH {
            return Err(AgentRunDomainError::InvalidExternalRunId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ExternalRunId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ExternalRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
