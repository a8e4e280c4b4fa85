//! Context reference operations scoped to a task.

use super::TaskLifecycleService;
use crate::agent_run::ports::AgentRunRepository;
use crate::context::domain::{ContextKey, ContextReference, ContextSuggestion};
use crate::task::{
    domain::TaskId,
    ports::{CommentRepository, TaskRepository},
    services::TaskLifecycleResult,
};
use mockable::Clock;

impl<T, R, M, C> TaskLifecycleService<T, R, M, C>
where
    T: TaskRepository,
    R: AgentRunRepository,
    M: CommentRepository,
    C: Clock + Send + Sync,
{
    /// Returns ranked context suggestions for the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`](crate::task::services::TaskLifecycleError)
    /// when the task is missing or ranking fails.
    pub async fn suggest_context(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<Vec<ContextSuggestion>> {
        let task = self.load_task(task_id).await?;
        Ok(self.context.suggest_context(&task).await?)
    }

    /// Stores accepted suggestions as context references.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`](crate::task::services::TaskLifecycleError)
    /// when the task is missing or archived, or persistence fails.
    pub async fn accept_suggestions(
        &self,
        task_id: TaskId,
        suggestions: &[ContextSuggestion],
    ) -> TaskLifecycleResult<Vec<ContextReference>> {
        let task = self.load_task(task_id).await?;
        task.ensure_active()?;
        Ok(self.context.accept_suggestions(&task, suggestions).await?)
    }

    /// Pins a workspace item to the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`](crate::task::services::TaskLifecycleError)
    /// when the task is missing or archived, or the item is already pinned.
    pub async fn add_context_reference(
        &self,
        task_id: TaskId,
        key: ContextKey,
    ) -> TaskLifecycleResult<ContextReference> {
        let task = self.load_task(task_id).await?;
        task.ensure_active()?;
        Ok(self.context.add_reference(&task, key).await?)
    }

    /// Unpins a workspace item; returns `false` when it was not pinned.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`](crate::task::services::TaskLifecycleError)
    /// when the task is missing or archived, or persistence fails.
    pub async fn remove_context_reference(
        &self,
        task_id: TaskId,
        key: &ContextKey,
    ) -> TaskLifecycleResult<bool> {
        let task = self.load_task(task_id).await?;
        task.ensure_active()?;
        Ok(self.context.remove_reference(task_id, key).await?)
    }

    /// Lists the task's context references, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`](crate::task::services::TaskLifecycleError)
    /// when the task is missing or persistence fails.
    pub async fn context_references(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<Vec<ContextReference>> {
        self.load_task(task_id).await?;
        Ok(self.context.references(task_id).await?)
    }
}
