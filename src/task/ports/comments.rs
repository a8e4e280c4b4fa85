//! Append-only comment storage port.

use crate::task::domain::{Comment, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for comment repository operations.
pub type CommentRepositoryResult<T> = Result<T, CommentRepositoryError>;

/// Comment persistence contract.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Appends a comment to its task's thread.
    ///
    /// # Errors
    ///
    /// Returns [`CommentRepositoryError::DuplicateComment`] when the comment
    /// ID already exists.
    async fn append(&self, comment: &Comment) -> CommentRepositoryResult<()>;

    /// Returns the task's comments, oldest first.
    async fn list_for_task(&self, task_id: TaskId) -> CommentRepositoryResult<Vec<Comment>>;
}

/// Errors returned by comment repository implementations.
#[derive(Debug, Clone, Error)]
pub enum CommentRepositoryError {
    /// A comment with the same identifier already exists.
    #[error("duplicate comment identifier: {0}")]
    DuplicateComment(crate::task::domain::CommentId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CommentRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
