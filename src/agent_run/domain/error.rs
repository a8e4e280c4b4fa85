//! Error types for agent run validation and parsing.

use super::AgentRunId;
use thiserror::Error;

/// Errors returned while constructing or mutating agent run values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentRunDomainError {
    /// The external run identifier is blank or too long.
    #[error("invalid external run identifier '{0}'")]
    InvalidExternalRunId(String),

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// The pull request URL is not an absolute HTTP(S) URL.
    #[error("invalid pull request url '{0}'")]
    InvalidPullRequestUrl(String),

    /// The run already received an external identifier.
    #[error("agent run {0} has already been dispatched")]
    AlreadyDispatched(AgentRunId),

    /// The run has reached a terminal status and cannot be changed.
    #[error("agent run {0} is already terminal")]
    RunTerminal(AgentRunId),

    /// The run has no pull request to update.
    #[error("agent run {0} has no pull request")]
    MissingPullRequest(AgentRunId),
}

/// Error returned while parsing run types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown run type: {0}")]
pub struct ParseRunTypeError(pub String);

/// Error returned while parsing run statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown run status: {0}")]
pub struct ParseRunStatusError(pub String);

/// Error returned while parsing pull request statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown pull request status: {0}")]
pub struct ParsePullRequestStatusError(pub String);
