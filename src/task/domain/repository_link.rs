//! Linked source repository value objects.

use super::{RepositoryFullName, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a validated branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 200;

/// Supported source-control hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VcsProvider {
    /// GitHub.
    #[serde(rename = "github")]
    GitHub,
    /// GitLab.
    #[serde(rename = "gitlab")]
    GitLab,
}

impl VcsProvider {
    /// Returns provider name in canonical storage format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
        }
    }
}

impl TryFrom<&str> for VcsProvider {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            _ => Err(TaskDomainError::InvalidVcsProvider(value.to_owned())),
        }
    }
}

impl fmt::Display for VcsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated Git branch name.
///
/// Branch names must be non-empty after trimming, must not contain colon
/// characters, and must not exceed `MAX_BRANCH_NAME_LENGTH` characters.
///
/// # Examples
///
///     use tasklane::task::domain::BranchName;
///
///     let name = BranchName::new("main").expect("valid");
///     assert_eq!(name.as_str(), "main");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidBranchName`] when the value is empty,
    /// contains a colon, or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();

        let is_invalid = normalized.is_empty()
            || normalized.contains(':')
            || normalized.len() > MAX_BRANCH_NAME_LENGTH;
        if is_invalid {
            return Err(TaskDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source repository linked to a workspace.
///
/// Implementation runs may only be requested for workspaces that resolve
/// to a linked repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkedRepository {
    provider: VcsProvider,
    full_name: RepositoryFullName,
    default_branch: BranchName,
}

impl LinkedRepository {
    /// Creates a linked repository from validated components.
    #[must_use]
    pub const fn new(
        provider: VcsProvider,
        full_name: RepositoryFullName,
        default_branch: BranchName,
    ) -> Self {
        Self {
            provider,
            full_name,
            default_branch,
        }
    }

    /// Creates a linked repository from raw external values.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskDomainError`] when any component is invalid.
    pub fn from_parts(
        provider: &str,
        full_name: &str,
        default_branch: &str,
    ) -> Result<Self, TaskDomainError> {
        Ok(Self::new(
            VcsProvider::try_from(provider)?,
            RepositoryFullName::new(full_name)?,
            BranchName::new(default_branch)?,
        ))
    }

    /// Returns the source-control host.
    #[must_use]
    pub const fn provider(&self) -> VcsProvider {
        self.provider
    }

    /// Returns the `owner/repo` name.
    #[must_use]
    pub const fn full_name(&self) -> &RepositoryFullName {
        &self.full_name
    }

    /// Returns the default branch.
    #[must_use]
    pub const fn default_branch(&self) -> &BranchName {
        &self.default_branch
    }
}

impl fmt::Display for LinkedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}",
            self.provider, self.full_name, self.default_branch
        )
    }
}
