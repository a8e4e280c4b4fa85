//! Service-level errors for task lifecycle operations.

use crate::agent_run::{
    domain::{AgentRunDomainError, AgentRunId, RunType},
    ports::{AgentRunRepositoryError, AgentRunnerError},
};
use crate::context::services::ContextError;
use crate::task::{
    domain::{TaskDomainError, TaskId},
    ports::{CommentRepositoryError, RepositoryLinkError, TaskRepositoryError},
};
use thiserror::Error;

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Task validation failed or a transition guard refused the change.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Agent run validation failed.
    #[error(transparent)]
    RunDomain(#[from] AgentRunDomainError),

    /// Task repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),

    /// Agent run repository operation failed.
    #[error(transparent)]
    RunRepository(#[from] AgentRunRepositoryError),

    /// Comment repository operation failed.
    #[error(transparent)]
    CommentRepository(#[from] CommentRepositoryError),

    /// Linked repository lookup failed.
    #[error(transparent)]
    RepositoryLink(#[from] RepositoryLinkError),

    /// Context assembly failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// No task has the identifier.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// No agent run has the identifier.
    #[error("agent run not found: {0}")]
    RunNotFound(AgentRunId),

    /// The requested parent task does not exist or belongs to another
    /// workspace.
    #[error("invalid parent task {0}")]
    InvalidParent(TaskId),

    /// A run of the same type is already active for the task.
    #[error("task {task_id} already has an active {run_type} run")]
    Conflict {
        /// Task that already has an active run.
        task_id: TaskId,
        /// Type of the active run.
        run_type: RunType,
    },

    /// The task's workspace has no linked repository.
    #[error("task {0} has no linked repository")]
    MissingRepository(TaskId),

    /// The run has not been handed to the runner yet.
    #[error("agent run {0} has not been dispatched")]
    NotDispatched(AgentRunId),

    /// The agent runner could not accept or report on the run.
    #[error("agent runner unavailable for run {run_id}: {source}")]
    RunnerUnavailable {
        /// Run whose dispatch or status query failed.
        run_id: AgentRunId,
        /// Runner failure.
        source: AgentRunnerError,
    },
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

impl TaskLifecycleError {
    pub(super) fn from_insert(err: AgentRunRepositoryError) -> Self {
        match err {
            AgentRunRepositoryError::ActiveRunExists { task_id, run_type } => {
                Self::Conflict { task_id, run_type }
            }
            other => Self::RunRepository(other),
        }
    }
}
