//! Task lifecycle orchestration service.
//!
//! Every operation that reads and then writes a task runs under the task's
//! async lock, and task writes are compare-and-set on the task revision, so
//! concurrent requests and runner callbacks for one task apply in order.
//!
//! Dispatching is split around the runner call: the run is stored in
//! `creating` and attached to the task under the lock, the lock is released
//! while `create_run` is awaited, and the result is recorded after the lock
//! is taken again. The stored run keeps later requests in conflict, and a
//! runner callback that arrives in between can take the lock.

mod comments;
mod context;
mod reconcile;
mod runs;

pub use reconcile::MISSING_PLAN_MESSAGE;

use super::{CreateTaskRequest, TaskLifecycleError, TaskLifecycleResult, locks::TaskLocks};
use crate::agent_run::{
    domain::{AgentRun, RunType},
    ports::{AgentRunRepository, AgentRunner},
};
use crate::config::{ConfigError, LifecycleConfig};
use crate::context::services::ContextAssemblyService;
use crate::task::{
    domain::{
        AgentMention, Assignee, Comment, ManualMoveGuard, NewTask, Task, TaskId, TaskStatus,
        WorkspaceId,
    },
    ports::{CommentRepository, RepositoryLinkResolver, TaskRepository},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators the lifecycle service is built from.
pub struct LifecyclePorts<T, R, M, C>
where
    C: Clock + Send + Sync,
{
    /// Task persistence.
    pub tasks: Arc<T>,
    /// Agent run persistence.
    pub runs: Arc<R>,
    /// Comment persistence.
    pub comments: Arc<M>,
    /// External coding-agent service.
    pub runner: Arc<dyn AgentRunner>,
    /// Workspace repository links.
    pub repository_links: Arc<dyn RepositoryLinkResolver>,
    /// Context assembly and prompt rendering.
    pub context: Arc<ContextAssemblyService<C>>,
    /// Time source.
    pub clock: Arc<C>,
}

/// Task lifecycle orchestration service.
pub struct TaskLifecycleService<T, R, M, C>
where
    T: TaskRepository,
    R: AgentRunRepository,
    M: CommentRepository,
    C: Clock + Send + Sync,
{
    tasks: Arc<T>,
    runs: Arc<R>,
    comments: Arc<M>,
    runner: Arc<dyn AgentRunner>,
    repository_links: Arc<dyn RepositoryLinkResolver>,
    context: Arc<ContextAssemblyService<C>>,
    clock: Arc<C>,
    config: LifecycleConfig,
    mention: AgentMention,
    locks: TaskLocks,
}

impl<T, R, M, C> TaskLifecycleService<T, R, M, C>
where
    T: TaskRepository,
    R: AgentRunRepository,
    M: CommentRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configured agent mention is invalid.
    pub fn new(
        ports: LifecyclePorts<T, R, M, C>,
        config: LifecycleConfig,
    ) -> Result<Self, ConfigError> {
        let mention = config.mention()?;
        Ok(Self {
            tasks: ports.tasks,
            runs: ports.runs,
            comments: ports.comments,
            runner: ports.runner,
            repository_links: ports.repository_links,
            context: ports.context,
            clock: ports.clock,
            config,
            mention,
            locks: TaskLocks::default(),
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Creates a task.
    ///
    /// With `plan_on_create` enabled, tasks assigned to the agent get a
    /// planning run straight away; a failed dispatch is logged and the task
    /// is returned with its plan marked failed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when validation fails, the parent is
    /// missing or in another workspace, or persistence fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        if let Some(parent_id) = request.parent_id {
            let parent = self.tasks.find_by_id(parent_id).await?;
            if parent.is_none_or(|found| found.workspace_id() != request.workspace_id) {
                return Err(TaskLifecycleError::InvalidParent(parent_id));
            }
        }

        let task = Task::new(
            NewTask {
                workspace_id: request.workspace_id,
                title: request.title,
                description: request.description,
                prompt: request.prompt,
                status: request.status.unwrap_or(TaskStatus::Todo),
                assignee: request.assignee,
                agent_type: request.agent_type,
                parent_id: request.parent_id,
                order_index: request.order_index,
            },
            &*self.clock,
        )?;
        self.tasks.store(&task).await?;
        info!(
            task_id = %task.id(),
            workspace_id = %task.workspace_id(),
            status = %task.status(),
            "task created"
        );

        if !(self.config.plan_on_create && task.is_assigned_to_agent()) {
            return Ok(task);
        }
        match self.request_planning_run(task.id()).await {
            Ok(started) => Ok(started.task),
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "planning on create failed");
                self.load_task(task.id()).await
            }
        }
    }

    /// Retrieves a task by identifier.
    ///
    /// Returns `Ok(None)` when the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn find_task(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.tasks.find_by_id(task_id).await?)
    }

    /// Lists direct subtasks ordered by `order_index`, then creation time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn subtasks(&self, parent_id: TaskId) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.tasks.find_subtasks(parent_id).await?)
    }

    /// Lists a workspace's tasks ordered by `order_index`, then creation
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when lookup fails.
    pub async fn workspace_tasks(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.tasks.list_by_workspace(workspace_id).await?)
    }

    /// Applies a manual board move.
    ///
    /// Moving to `done` while any run is active, or to `in_review` without
    /// a pull request on the current run, is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] wrapping
    /// `InvalidStatusTransition` or `TaskArchived`,
    /// [`TaskLifecycleError::TaskNotFound`], or a repository error.
    pub async fn update_task_status(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> TaskLifecycleResult<Task> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self.load_task(task_id).await?;

        let has_active_run = self.runs.find_active(task_id, RunType::Planning).await?.is_some()
            || self.runs.find_active(task_id, RunType::Implementation).await?.is_some();
        let current_run_has_pull_request = self
            .current_implementation_run(&task)
            .await?
            .is_some_and(|run| run.pull_request().is_some());
        let guard = ManualMoveGuard {
            has_active_run,
            current_run_has_pull_request,
        };

        let from = task.status();
        if !task.move_to(target, guard, &*self.clock)? {
            return Ok(task);
        }
        let updated = self.tasks.update(&task).await?;
        info!(%task_id, %from, to = %target, "task moved");
        Ok(updated)
    }

    /// Changes the assignee. Reassigning away from the agent abandons its
    /// active runs.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is missing or archived,
    /// or persistence fails.
    pub async fn reassign_task(
        &self,
        task_id: TaskId,
        assignee: Option<Assignee>,
    ) -> TaskLifecycleResult<Task> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self.load_task(task_id).await?;
        task.ensure_active()?;
        if assignee != Some(Assignee::Agent) {
            self.abandon_active_runs(&mut task).await?;
        }
        task.reassign(assignee, &*self.clock)?;
        let updated = self.tasks.update(&task).await?;
        info!(%task_id, assignee = ?assignee, "task reassigned");
        Ok(updated)
    }

    /// Archives a task, abandoning its active runs. Rows are kept.
    ///
    /// Archiving an archived task returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is missing or
    /// persistence fails.
    pub async fn archive_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self.load_task(task_id).await?;
        if task.is_archived() {
            return Ok(task);
        }
        self.abandon_active_runs(&mut task).await?;
        task.archive(&*self.clock);
        let updated = self.tasks.update(&task).await?;
        info!(%task_id, "task archived");
        Ok(updated)
    }

    /// Lists a task's comments by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::TaskNotFound`] or a repository error.
    pub async fn comments(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<Comment>> {
        self.load_task(task_id).await?;
        Ok(self.comments.list_for_task(task_id).await?)
    }

    /// Lists every run of a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::TaskNotFound`] or a repository error.
    pub async fn runs_for_task(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<AgentRun>> {
        self.load_task(task_id).await?;
        Ok(self.runs.list_for_task(task_id).await?)
    }

    async fn load_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::TaskNotFound(task_id))
    }

    async fn current_implementation_run(
        &self,
        task: &Task,
    ) -> TaskLifecycleResult<Option<AgentRun>> {
        match task.current_run() {
            Some(run_id) => Ok(self.runs.find_by_id(run_id).await?),
            None => Ok(None),
        }
    }

    async fn abandon_active_runs(&self, task: &mut Task) -> TaskLifecycleResult<()> {
        for run_type in [RunType::Planning, RunType::Implementation] {
            let Some(mut run) = self.runs.find_active(task.id(), run_type).await? else {
                continue;
            };
            if !run.abandon(&*self.clock) {
                continue;
            }
            self.runs.update(&run).await?;
            match run_type {
                RunType::Planning => task.abandon_planning(&*self.clock),
                RunType::Implementation => task.abandon_implementation(&*self.clock),
            }
            info!(task_id = %task.id(), run_id = %run.id(), %run_type, "run abandoned");
        }
        Ok(())
    }
}
