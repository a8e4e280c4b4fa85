//! Task status, plan status, assignee, and lifecycle policy enumerations.

use super::{ParseAssigneeError, ParsePlanStatusError, ParseTaskStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board column of a task.
///
/// The usual flow is `backlog` → `todo` → `in_progress` → `in_review` →
/// `done`; agent runs drive most moves, and users may drag tasks between
/// columns at any time subject to the guards in
/// [`Task::move_to`](super::Task::move_to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet scheduled.
    Backlog,
    /// Scheduled and ready to be worked on.
    Todo,
    /// Being implemented.
    InProgress,
    /// A pull request awaits review.
    InReview,
    /// Completed.
    Done,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
        }
    }

    /// Returns `true` for the terminal `done` column.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns `true` where an agent mention in a comment starts follow-up
    /// implementation work.
    #[must_use]
    pub const fn accepts_follow_up(self) -> bool {
        matches!(self, Self::InProgress | Self::InReview)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "in_review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Progress of the task's implementation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// No plan has been requested yet.
    Pending,
    /// A planning run is in flight.
    Generating,
    /// A plan is available.
    Ready,
    /// The last planning run failed.
    Failed,
}

impl PlanStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PlanStatus {
    type Error = ParsePlanStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(ParsePlanStatusError(value.to_owned())),
        }
    }
}

/// Who is responsible for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignee {
    /// A human workspace member.
    User,
    /// The external coding agent.
    Agent,
}

impl Assignee {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Assignee {
    type Error = ParseAssigneeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            _ => Err(ParseAssigneeError(value.to_owned())),
        }
    }
}

/// Where a task goes when an implementation run finishes without a pull
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoChangesPolicy {
    /// Back to `todo` so a human can decide what to do next.
    #[default]
    RevertToTodo,
    /// Straight to `done`.
    MarkDone,
}

impl TryFrom<&str> for NoChangesPolicy {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "revert_to_todo" => Ok(Self::RevertToTodo),
            "mark_done" => Ok(Self::MarkDone),
            _ => Err(format!("expected revert_to_todo or mark_done, got '{value}'")),
        }
    }
}

/// Where a task goes when its pull request is closed without merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedPullRequestDisposition {
    /// Back to `in_progress` for rework.
    #[default]
    Rework,
    /// Back to `todo`.
    Todo,
}

impl ClosedPullRequestDisposition {
    /// Returns the status a task takes under this disposition.
    #[must_use]
    pub const fn target_status(self) -> TaskStatus {
        match self {
            Self::Rework => TaskStatus::InProgress,
            Self::Todo => TaskStatus::Todo,
        }
    }
}

impl TryFrom<&str> for ClosedPullRequestDisposition {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rework" => Ok(Self::Rework),
            "todo" => Ok(Self::Todo),
            _ => Err(format!("expected rework or todo, got '{value}'")),
        }
    }
}
