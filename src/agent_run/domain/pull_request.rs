//! Pull request value objects attached to implementation runs.

use super::{AgentRunDomainError, PullRequestStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a pull request URL stored in a `VARCHAR(2048)` column.
const MAX_URL_LENGTH: usize = 2048;

/// Positive pull request number from the source-control host.
///
/// Must be positive and representable by `PostgreSQL` `BIGINT`
/// (`<= i64::MAX`).
///
/// # Examples
///
///     use tasklane::agent_run::domain::PullRequestNumber;
///
///     let pr_num = PullRequestNumber::new(42).expect("valid");
///     assert_eq!(pr_num.value(), 42);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Largest pull request number representable in the current schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunDomainError::InvalidPullRequestNumber`] when the
    /// value is zero or exceeds the schema-backed maximum (`i64::MAX`).
    pub const fn new(value: u64) -> Result<Self, AgentRunDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(AgentRunDomainError::InvalidPullRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute `http` or `https` URL of a pull request.
///
/// The URL is the lookup key for pull request webhooks, so it is stored
/// exactly as reported apart from trimming surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestUrl(String);

impl PullRequestUrl {
    /// Creates a validated pull request URL.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunDomainError::InvalidPullRequestUrl`] when the value
    /// lacks an `http://` or `https://` scheme, has no host, contains
    /// whitespace, or exceeds 2048 bytes.
    pub fn new(value: impl Into<String>) -> Result<Self, AgentRunDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if !Self::is_valid(normalized) {
            return Err(AgentRunDomainError::InvalidPullRequestUrl(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    fn is_valid(url: &str) -> bool {
        let remainder = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        let has_host = remainder
            .and_then(|rest| rest.split('/').next())
            .is_some_and(|host| !host.is_empty());

        has_host && url.len() <= MAX_URL_LENGTH && !url.chars().any(char::is_whitespace)
    }

    /// Returns the URL as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PullRequestUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PullRequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull request produced by an implementation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequest {
    url: PullRequestUrl,
    number: PullRequestNumber,
    status: PullRequestStatus,
}

impl PullRequest {
    /// Creates a freshly opened pull request reference.
    #[must_use]
    pub const fn opened(url: PullRequestUrl, number: PullRequestNumber) -> Self {
        Self {
            url,
            number,
            status: PullRequestStatus::Open,
        }
    }

    /// Reconstructs a pull request reference from persisted parts.
    #[must_use]
    pub const fn from_persisted(
        url: PullRequestUrl,
        number: PullRequestNumber,
        status: PullRequestStatus,
    ) -> Self {
        Self {
            url,
            number,
            status,
        }
    }

    /// Creates a pull request reference from raw external values.
    ///
    /// # Errors
    ///
    /// Returns an [`AgentRunDomainError`] when the URL or number is invalid.
    pub fn from_parts(url: &str, number: u64) -> Result<Self, AgentRunDomainError> {
        Ok(Self::opened(
            PullRequestUrl::new(url)?,
            PullRequestNumber::new(number)?,
        ))
    }

    /// Returns the pull request URL.
    #[must_use]
    pub const fn url(&self) -> &PullRequestUrl {
        &self.url
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the pull request status.
    #[must_use]
    pub const fn status(&self) -> PullRequestStatus {
        self.status
    }

    pub(super) const fn set_status(&mut self, status: PullRequestStatus) {
        self.status = status;
    }
}

impl fmt::Display for PullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.number, self.url)
    }
}
