//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use std::fmt;
use thiserror::Error;

/// Why a status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The task still has a non-terminal agent run.
    ActiveRun,
    /// `in_review` requires the current run to reference a pull request.
    MissingPullRequest,
}

impl fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveRun => f.write_str("an agent run is still active"),
            Self::MissingPullRequest => f.write_str("the current run has no pull request"),
        }
    }
}

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The version control provider value is unsupported.
    #[error("unsupported version control provider: {0}")]
    InvalidVcsProvider(String),

    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The branch name is empty, too long, or contains a colon.
    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    /// The user identifier is blank.
    #[error("invalid user identifier '{0}'")]
    InvalidUserId(String),

    /// The comment body is empty after trimming.
    #[error("comment body must not be empty")]
    EmptyCommentBody,

    /// The agent mention token is blank or contains whitespace.
    #[error("invalid agent mention token '{0}'")]
    InvalidAgentMention(String),

    /// A status change was refused.
    #[error("task {task_id} cannot move from {from} to {to}: {reason}")]
    InvalidStatusTransition {
        /// Task whose status change was refused.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
        /// Rule that refused the change.
        reason: TransitionRejection,
    },

    /// The task has been archived and accepts no further changes.
    #[error("task {0} is archived")]
    TaskArchived(TaskId),

    /// Implementation work requires the task to be assigned to the agent.
    #[error("task {0} is not assigned to the agent")]
    NotAssignedToAgent(TaskId),
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing plan statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown plan status: {0}")]
pub struct ParsePlanStatusError(pub String);

/// Error returned while parsing assignees from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown assignee: {0}")]
pub struct ParseAssigneeError(pub String);
