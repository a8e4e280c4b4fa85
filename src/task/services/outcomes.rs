//! Results of lifecycle operations that can succeed in more than one way.

use crate::agent_run::{
    domain::{AgentRun, AgentRunId, IgnoredReport},
    ports::AgentRunnerError,
};
use crate::task::domain::{Comment, Task, TaskStatus};

/// A run that was created and handed to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRun {
    /// Task after the run was attached.
    pub task: Task,
    /// The dispatched run.
    pub run: AgentRun,
}

/// Result of applying a runner report or pull request event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The report changed the run, and possibly the task.
    Applied {
        /// Task after reconciliation.
        task: Task,
        /// Run after reconciliation.
        run: AgentRun,
    },
    /// The report was dropped without side effects.
    Ignored(IgnoredReport),
}

/// Why an agent mention did not start work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotTriggeredReason {
    /// Follow-ups are only taken while the task is in progress or in review.
    StatusNotEligible(TaskStatus),
    /// The task is not assigned to the agent.
    NotAssignedToAgent,
    /// The workspace has no linked repository.
    MissingRepository,
}

/// What posting a comment caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    /// The comment was stored; it did not address the agent.
    Recorded,
    /// A follow-up implementation run was started.
    RunStarted(AgentRun),
    /// The instructions wait for the active implementation run to end.
    Queued,
    /// The comment addressed the agent but no work was started.
    NotTriggered(NotTriggeredReason),
    /// A follow-up run was created but the runner refused it.
    DispatchFailed {
        /// The failed run.
        run_id: AgentRunId,
        /// Runner failure.
        error: AgentRunnerError,
    },
}

/// A stored comment and its effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    /// The stored comment.
    pub comment: Comment,
    /// What the comment caused.
    pub outcome: CommentOutcome,
}
