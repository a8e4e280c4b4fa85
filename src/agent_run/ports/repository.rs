//! Repository port for agent run persistence and lookup.

use crate::agent_run::domain::{AgentRun, AgentRunId, ExternalRunId, PullRequestUrl, RunType};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent run repository operations.
pub type AgentRunRepositoryResult<T> = Result<T, AgentRunRepositoryError>;

/// Agent run persistence contract.
///
/// Implementations must make [`AgentRunRepository::insert`] a
/// compare-and-set on `(task_id, run_type)`: at most one non-terminal run of
/// each type may exist per task.
#[async_trait]
pub trait AgentRunRepository: Send + Sync {
    /// Inserts a new run.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunRepositoryError::ActiveRunExists`] when the task
    /// already has an active run of the same type,
    /// [`AgentRunRepositoryError::DuplicateRun`] when the identifier exists,
    /// or [`AgentRunRepositoryError::DuplicateExternalRun`] when the external
    /// identifier is already taken.
    async fn insert(&self, run: &AgentRun) -> AgentRunRepositoryResult<()>;

    /// Persists changes to an existing run.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunRepositoryError::NotFound`] when the run does not
    /// exist or [`AgentRunRepositoryError::DuplicateExternalRun`] when the
    /// external identifier belongs to another run.
    async fn update(&self, run: &AgentRun) -> AgentRunRepositoryResult<()>;

    /// Finds a run by internal identifier.
    async fn find_by_id(&self, id: AgentRunId) -> AgentRunRepositoryResult<Option<AgentRun>>;

    /// Finds a run by the identifier the external runner assigned.
    async fn find_by_external_id(
        &self,
        external_run_id: &ExternalRunId,
    ) -> AgentRunRepositoryResult<Option<AgentRun>>;

    /// Finds the most recently started run carrying the pull request URL.
    ///
    /// Follow-up runs inherit their predecessor's pull request, so several
    /// runs may share a URL.
    async fn find_by_pull_request_url(
        &self,
        url: &PullRequestUrl,
    ) -> AgentRunRepositoryResult<Option<AgentRun>>;

    /// Finds the active run of the given type for a task.
    async fn find_active(
        &self,
        task_id: TaskId,
        run_type: RunType,
    ) -> AgentRunRepositoryResult<Option<AgentRun>>;

    /// Lists every run of a task, oldest first.
    async fn list_for_task(&self, task_id: TaskId) -> AgentRunRepositoryResult<Vec<AgentRun>>;

    /// Lists every active run, oldest first.
    async fn list_active(&self) -> AgentRunRepositoryResult<Vec<AgentRun>>;
}

/// Errors returned by agent run repository implementations.
#[derive(Debug, Clone, Error)]
pub enum AgentRunRepositoryError {
    /// A run with the same identifier already exists.
    #[error("duplicate agent run identifier: {0}")]
    DuplicateRun(AgentRunId),

    /// The task already has an active run of the same type.
    #[error("task {task_id} already has an active {run_type} run")]
    ActiveRunExists {
        /// Task owning the runs.
        task_id: TaskId,
        /// Contended run type.
        run_type: RunType,
    },

    /// The external run identifier is already recorded on another run.
    #[error("duplicate external run identifier: {0}")]
    DuplicateExternalRun(ExternalRunId),

    /// The run was not found.
    #[error("agent run not found: {0}")]
    NotFound(AgentRunId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentRunRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
