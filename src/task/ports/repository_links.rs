//! Lookup of the source repository linked to a workspace.

use crate::task::domain::{LinkedRepository, WorkspaceId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Resolves the repository an implementation run should work against.
#[async_trait]
pub trait RepositoryLinkResolver: Send + Sync {
    /// Returns the workspace's linked repository, or `None` when the
    /// workspace has not linked one.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryLinkError`] when the lookup itself fails.
    async fn resolve(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<LinkedRepository>, RepositoryLinkError>;
}

/// Failure looking up a workspace's linked repository.
#[derive(Debug, Clone, Error)]
#[error("repository link lookup failed: {0}")]
pub struct RepositoryLinkError(pub Arc<dyn std::error::Error + Send + Sync>);

impl RepositoryLinkError {
    /// Wraps a lookup failure.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
