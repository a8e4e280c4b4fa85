//! Port for the workspace context pool and its ranking collaborator.

use crate::context::domain::{ContextDocument, ContextKey, ContextQuery, ContextSuggestion};
use crate::task::domain::WorkspaceId;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for context store calls.
pub type ContextStoreResult<T> = Result<T, ContextStoreError>;

/// Read access to workspace documents, messages, and links.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Ranks the workspace pool against the task title.
    ///
    /// Implementations may return candidates in any order and with any
    /// score; callers sort, limit, and threshold them.
    ///
    /// # Errors
    ///
    /// Returns [`ContextStoreError`] when ranking fails.
    async fn suggest_context(&self, query: &ContextQuery)
    -> ContextStoreResult<Vec<ContextSuggestion>>;

    /// Fetches an item's body, or `None` when it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`ContextStoreError`] when the store cannot be read.
    async fn fetch(
        &self,
        workspace_id: WorkspaceId,
        key: &ContextKey,
    ) -> ContextStoreResult<Option<ContextDocument>>;
}

/// Errors reported by context store implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextStoreError {
    /// The store or ranker could not be reached.
    #[error("context store unavailable: {0}")]
    Unavailable(String),
}
