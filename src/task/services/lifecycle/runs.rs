//! Creating and dispatching agent runs.

use super::TaskLifecycleService;
use crate::agent_run::{
    domain::{AgentRun, PullRequestStatus, RunType},
    ports::{AgentRunRepository, RunDispatch},
};
use crate::context::services::PreparedPrompt;
use crate::task::{
    domain::{LinkedRepository, StatusSnapshot, Task, TaskId},
    ports::{CommentRepository, TaskRepository},
    services::{StartedRun, TaskLifecycleError, TaskLifecycleResult},
};
use mockable::Clock;
use tracing::{debug, info, warn};

/// How a new implementation run relates to the task's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ImplementationStart {
    /// Move the task to `in_progress`.
    Fresh,
    /// Keep the task `in_review` and carry the open pull request forward.
    FollowUp,
}

/// A run stored in `creating` that has not been handed to the runner yet.
///
/// Built under the task lock. `dispatch` calls the runner after the lock is
/// released so runner callbacks that arrive before `create_run` returns can
/// be reconciled.
#[derive(Debug)]
pub(super) struct PendingDispatch {
    dispatch: RunDispatch,
    prior: StatusSnapshot,
}

impl PendingDispatch {
    pub(super) const fn task_id(&self) -> TaskId {
        self.dispatch.task_id
    }
}

impl<T, R, M, C> TaskLifecycleService<T, R, M, C>
where
    T: TaskRepository,
    R: AgentRunRepository,
    M: CommentRepository,
    C: Clock + Send + Sync,
{
    /// Requests a planning run for the task.
    ///
    /// Marks the plan `generating`, assembles context, and dispatches the run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Conflict`] when a planning run is
    /// already active, [`TaskLifecycleError::RunnerUnavailable`] when the
    /// runner refuses the dispatch (the plan is then marked `failed`), or
    /// another [`TaskLifecycleError`] for missing or archived tasks.
    pub async fn request_planning_run(&self, task_id: TaskId) -> TaskLifecycleResult<StartedRun> {
        let pending = self.prepare_planning_run(task_id).await?;
        self.dispatch(pending).await
    }

    /// Requests an implementation run for the task.
    ///
    /// Moves the task to `in_progress` and dispatches the run against the
    /// workspace's linked repository.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Conflict`] when an implementation run is
    /// already active, [`TaskLifecycleError::MissingRepository`] when the
    /// workspace has no linked repository (the task is left unchanged),
    /// [`TaskLifecycleError::RunnerUnavailable`] when the runner refuses the
    /// dispatch (the task returns to its prior status), or another
    /// [`TaskLifecycleError`] for missing, archived, or unassigned tasks.
    pub async fn request_implementation_run(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<StartedRun> {
        let pending = self.prepare_implementation_request(task_id).await?;
        self.dispatch(pending).await
    }

    async fn prepare_planning_run(&self, task_id: TaskId) -> TaskLifecycleResult<PendingDispatch> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self.load_task(task_id).await?;
        task.ensure_active()?;
        if self.runs.find_active(task_id, RunType::Planning).await?.is_some() {
            return Err(TaskLifecycleError::Conflict {
                task_id,
                run_type: RunType::Planning,
            });
        }

        let prepared = self
            .context
            .prepare_prompt(&task, RunType::Planning, None, None)
            .await?;
        let run = AgentRun::new(task_id, RunType::Planning, &*self.clock);
        self.runs
            .insert(&run)
            .await
            .map_err(TaskLifecycleError::from_insert)?;
        let prior = task.status_snapshot();
        task.begin_planning(run.id(), &*self.clock)?;
        self.tasks.update(&task).await?;
        Ok(Self::pending(&run, prepared, None, prior))
    }

    async fn prepare_implementation_request(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<PendingDispatch> {
        let _guard = self.locks.acquire(task_id).await;
        let task = self.load_task(task_id).await?;
        task.ensure_active()?;
        task.ensure_agent_assigned()?;
        if self
            .runs
            .find_active(task_id, RunType::Implementation)
            .await?
            .is_some()
        {
            return Err(TaskLifecycleError::Conflict {
                task_id,
                run_type: RunType::Implementation,
            });
        }
        let repository = self
            .repository_links
            .resolve(task.workspace_id())
            .await?
            .ok_or(TaskLifecycleError::MissingRepository(task_id))?;

        self.prepare_implementation(task, repository, None, ImplementationStart::Fresh)
            .await
    }

    /// Creates an implementation run and attaches it to the task. The caller
    /// holds the task lock and has checked that no implementation run is
    /// active.
    pub(super) async fn prepare_implementation(
        &self,
        mut task: Task,
        repository: LinkedRepository,
        instructions: Option<String>,
        start: ImplementationStart,
    ) -> TaskLifecycleResult<PendingDispatch> {
        let prepared = self
            .context
            .prepare_prompt(
                &task,
                RunType::Implementation,
                Some(&repository),
                instructions.as_deref(),
            )
            .await?;

        let mut run = AgentRun::new(task.id(), RunType::Implementation, &*self.clock);
        if let Some(text) = instructions {
            run = run.with_instructions(text);
        }
        if start == ImplementationStart::FollowUp {
            let inherited = self
                .current_implementation_run(&task)
                .await?
                .and_then(|previous| previous.pull_request().cloned())
                .filter(|pull_request| pull_request.status() == PullRequestStatus::Open);
            run = run.with_inherited_pull_request(inherited);
        }
        self.runs
            .insert(&run)
            .await
            .map_err(TaskLifecycleError::from_insert)?;

        let prior = task.status_snapshot();
        match start {
            ImplementationStart::Fresh => task.begin_implementation(run.id(), &*self.clock)?,
            ImplementationStart::FollowUp => task.attach_follow_up_run(run.id(), &*self.clock)?,
        }
        self.tasks.update(&task).await?;
        Ok(Self::pending(&run, prepared, Some(repository), prior))
    }

    fn pending(
        run: &AgentRun,
        prepared: PreparedPrompt,
        repository: Option<LinkedRepository>,
        prior: StatusSnapshot,
    ) -> PendingDispatch {
        PendingDispatch {
            dispatch: RunDispatch {
                run_id: run.id(),
                task_id: run.task_id(),
                run_type: run.run_type(),
                prompt: prepared.prompt,
                context: prepared.items,
                repository,
                instructions: run.instructions().map(str::to_owned),
            },
            prior,
        }
    }

    /// Hands a prepared run to the runner, then records the result under
    /// the task lock. Must be called without holding the task lock.
    pub(super) async fn dispatch(
        &self,
        pending: PendingDispatch,
    ) -> TaskLifecycleResult<StartedRun> {
        let PendingDispatch { dispatch, prior } = pending;
        let created = self.runner.create_run(&dispatch).await;

        let _guard = self.locks.acquire(dispatch.task_id).await;
        let (mut task, mut run) = self
            .reload(dispatch.run_id)
            .await?
            .ok_or(TaskLifecycleError::RunNotFound(dispatch.run_id))?;
        match created {
            Ok(external_run_id) => {
                match run.external_run_id() {
                    None if run.is_active() => {
                        run.mark_dispatched(external_run_id, &*self.clock)?;
                        self.runs.update(&run).await?;
                    }
                    None => {
                        debug!(
                            run_id = %run.id(),
                            status = %run.status(),
                            "run ended before dispatch returned"
                        );
                    }
                    Some(recorded) if *recorded != external_run_id => {
                        warn!(
                            run_id = %run.id(),
                            %recorded,
                            returned = %external_run_id,
                            "runner returned a different identifier than its callback"
                        );
                    }
                    Some(_) => {}
                }
                info!(
                    task_id = %task.id(),
                    run_id = %run.id(),
                    run_type = %run.run_type(),
                    external_run_id = ?run.external_run_id(),
                    "run dispatched"
                );
                Ok(StartedRun { task, run })
            }
            Err(source) => {
                warn!(
                    task_id = %task.id(),
                    run_id = %run.id(),
                    error = %source,
                    "run dispatch failed"
                );
                let message = source.to_string();
                if run.force_fail(message.as_str(), &*self.clock) {
                    self.runs.update(&run).await?;
                    if Self::is_current(&task, &run) && !task.is_archived() {
                        match run.run_type() {
                            RunType::Planning => task.fail_planning(message, &*self.clock),
                            RunType::Implementation => {
                                task.restore_after_failed_dispatch(prior, message, &*self.clock);
                            }
                        }
                        self.tasks.update(&task).await?;
                    }
                }
                Err(TaskLifecycleError::RunnerUnavailable {
                    run_id: run.id(),
                    source,
                })
            }
        }
    }
}
