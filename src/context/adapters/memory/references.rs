//! In-memory context reference repository.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::context::{
    domain::{ContextKey, ContextReference},
    ports::{
        ContextReferenceRepository, ContextReferenceRepositoryError,
        ContextReferenceRepositoryResult,
    },
};
use crate::task::domain::TaskId;

/// Thread-safe in-memory context reference repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContextReferenceRepository {
    references: Arc<RwLock<Vec<ContextReference>>>,
}

impl InMemoryContextReferenceRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextReferenceRepository for InMemoryContextReferenceRepository {
    async fn add(&self, reference: &ContextReference) -> ContextReferenceRepositoryResult<()> {
        let mut references = self.references.write().map_err(|err| {
            ContextReferenceRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let duplicate = references.iter().any(|existing| {
            existing.task_id() == reference.task_id() && existing.key() == reference.key()
        });
        if duplicate {
            return Err(ContextReferenceRepositoryError::DuplicateReference {
                task_id: reference.task_id(),
                key: reference.key().clone(),
            });
        }
        references.push(reference.clone());
        Ok(())
    }

    async fn remove(
        &self,
        task_id: TaskId,
        key: &ContextKey,
    ) -> ContextReferenceRepositoryResult<bool> {
        let mut references = self.references.write().map_err(|err| {
            ContextReferenceRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let before = references.len();
        references.retain(|existing| !(existing.task_id() == task_id && existing.key() == key));
        Ok(references.len() != before)
    }

    async fn list_for_task(
        &self,
        task_id: TaskId,
    ) -> ContextReferenceRepositoryResult<Vec<ContextReference>> {
        let references = self.references.read().map_err(|err| {
            ContextReferenceRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut attached: Vec<ContextReference> = references
            .iter()
            .filter(|reference| reference.task_id() == task_id)
            .cloned()
            .collect();
        attached.sort_by_key(ContextReference::added_at);
        Ok(attached)
    }
}
