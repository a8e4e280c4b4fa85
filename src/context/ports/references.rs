//! Persistence port for context references.

use crate::context::domain::{ContextKey, ContextReference};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for context reference repository operations.
pub type ContextReferenceRepositoryResult<T> = Result<T, ContextReferenceRepositoryError>;

/// Context reference persistence contract, keyed by
/// `(task, refType, refId)`.
#[async_trait]
pub trait ContextReferenceRepository: Send + Sync {
    /// Attaches a reference.
    ///
    /// # Errors
    ///
    /// Returns [`ContextReferenceRepositoryError::DuplicateReference`] when
    /// the task already references the same key.
    async fn add(&self, reference: &ContextReference) -> ContextReferenceRepositoryResult<()>;

    /// Detaches a reference; returns `false` when it was not attached.
    async fn remove(
        &self,
        task_id: TaskId,
        key: &ContextKey,
    ) -> ContextReferenceRepositoryResult<bool>;

    /// Returns the task's references, oldest first.
    async fn list_for_task(
        &self,
        task_id: TaskId,
    ) -> ContextReferenceRepositoryResult<Vec<ContextReference>>;
}

/// Errors returned by context reference repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ContextReferenceRepositoryError {
    /// The task already references the key.
    #[error("task {task_id} already references {key}")]
    DuplicateReference {
        /// Task holding the reference.
        task_id: TaskId,
        /// Duplicated key.
        key: ContextKey,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ContextReferenceRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
