//! Repository port for task persistence and lookup.

use crate::task::domain::{Task, TaskId, WorkspaceId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// The write only succeeds when the stored revision still equals
    /// `task.revision()`; the returned task carries the incremented revision.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// or [`TaskRepositoryError::StaleRevision`] when another writer got
    /// there first.
    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task>;

    /// Finds a task by internal task identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns direct subtasks of `parent_id`, ordered by `order_index` then
    /// creation time.
    async fn find_subtasks(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns every task in the workspace, ordered by `order_index` then
    /// creation time.
    async fn list_by_workspace(&self, workspace_id: WorkspaceId)
    -> TaskRepositoryResult<Vec<Task>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The stored revision moved on since the task was read.
    #[error(
        "task {task_id} was modified concurrently (expected revision {expected}, found {found})"
    )]
    StaleRevision {
        /// Task that failed to update.
        task_id: TaskId,
        /// Revision the writer read.
        expected: u64,
        /// Revision currently stored.
        found: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
