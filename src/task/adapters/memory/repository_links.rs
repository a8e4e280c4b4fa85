//! Fixed workspace-to-repository mapping.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{LinkedRepository, WorkspaceId},
    ports::{RepositoryLinkError, RepositoryLinkResolver},
};

/// Repository links held in memory, editable at runtime.
#[derive(Debug, Clone, Default)]
pub struct StaticRepositoryLinks {
    links: Arc<RwLock<HashMap<WorkspaceId, LinkedRepository>>>,
}

impl StaticRepositoryLinks {
    /// Creates a resolver with no linked workspaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `repository` to `workspace_id`, replacing any previous link.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryLinkError`] when the internal lock is poisoned.
    pub fn link(
        &self,
        workspace_id: WorkspaceId,
        repository: LinkedRepository,
    ) -> Result<(), RepositoryLinkError> {
        let mut links = self
            .links
            .write()
            .map_err(|err| RepositoryLinkError::new(std::io::Error::other(err.to_string())))?;
        links.insert(workspace_id, repository);
        Ok(())
    }

    /// Removes the workspace's link, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryLinkError`] when the internal lock is poisoned.
    pub fn unlink(&self, workspace_id: WorkspaceId) -> Result<(), RepositoryLinkError> {
        let mut links = self
            .links
            .write()
            .map_err(|err| RepositoryLinkError::new(std::io::Error::other(err.to_string())))?;
        links.remove(&workspace_id);
        Ok(())
    }
}

#[async_trait]
impl RepositoryLinkResolver for StaticRepositoryLinks {
    async fn resolve(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<LinkedRepository>, RepositoryLinkError> {
        let links = self
            .links
            .read()
            .map_err(|err| RepositoryLinkError::new(std::io::Error::other(err.to_string())))?;
        Ok(links.get(&workspace_id).cloned())
    }
}
