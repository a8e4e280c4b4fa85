//! In-memory append-only comment store.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{Comment, TaskId},
    ports::{CommentRepository, CommentRepositoryError, CommentRepositoryResult},
};

/// Thread-safe in-memory comment repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCommentRepository {
    comments: Arc<RwLock<Vec<Comment>>>,
}

impl InMemoryCommentRepository {
    /// Creates an empty comment repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn append(&self, comment: &Comment) -> CommentRepositoryResult<()> {
        let mut comments = self.comments.write().map_err(|err| {
            CommentRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        if comments.iter().any(|existing| existing.id() == comment.id()) {
            return Err(CommentRepositoryError::DuplicateComment(comment.id()));
        }
        comments.push(comment.clone());
        Ok(())
    }

    async fn list_for_task(&self, task_id: TaskId) -> CommentRepositoryResult<Vec<Comment>> {
        let comments = self.comments.read().map_err(|err| {
            CommentRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut thread: Vec<Comment> = comments
            .iter()
            .filter(|comment| comment.task_id() == task_id)
            .cloned()
            .collect();
        thread.sort_by_key(Comment::created_at);
        Ok(thread)
    }
}
