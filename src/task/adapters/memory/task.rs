//! In-memory repository for task lifecycle tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{Task, TaskId, WorkspaceId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, filter: impl Fn(&Task) -> bool) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut tasks: Vec<Task> = state.values().filter(|task| filter(task)).cloned().collect();
        tasks.sort_by_key(|task| (task.order_index(), task.created_at()));
        Ok(tasks)
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        if state.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        let mut state = self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let stored = state
            .get(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;
        if stored.revision() != task.revision() {
            return Err(TaskRepositoryError::StaleRevision {
                task_id: task.id(),
                expected: task.revision(),
                found: stored.revision(),
            });
        }

        let updated = task.clone().with_next_revision();
        state.insert(task.id(), updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.get(&id).cloned())
    }

    async fn find_subtasks(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        self.collect_sorted(|task| task.parent_id() == Some(parent_id))
    }

    async fn list_by_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskRepositoryResult<Vec<Task>> {
        self.collect_sorted(|task| task.workspace_id() == workspace_id)
    }
}
