//! Applying runner reports, pull request events, polling, and the
//! run-duration watchdog.

use super::{TaskLifecycleService, runs::PendingDispatch};
use crate::agent_run::{
    domain::{
        AgentRun, AgentRunId, IgnoredReport, PullRequestChange, PullRequestEvent,
        PullRequestStatus, ReportDisposition, RunStatus, RunStatusReport, RunType,
    },
    ports::AgentRunRepository,
};
use crate::task::{
    domain::{Task, TaskStatus},
    ports::{CommentRepository, TaskRepository},
    services::{ReconcileOutcome, TaskLifecycleError, TaskLifecycleResult},
};
use chrono::TimeDelta;
use mockable::Clock;
use tracing::{debug, info, warn};

/// Plan failure message for planning runs that finished without output.
pub const MISSING_PLAN_MESSAGE: &str = "planning run finished without a plan";

/// Where the locked part of reconciliation leaves a report.
enum Reconciled {
    /// Nothing is left to do once the task lock is released.
    Done(ReconcileOutcome),
    /// The run ended with instructions queued behind it; the follow-up run
    /// still has to be dispatched.
    FollowUp {
        run: AgentRun,
        pending: PendingDispatch,
    },
}

/// A task after a terminal run's effects were applied.
enum Aftermath {
    Settled(Task),
    FollowUp(PendingDispatch),
}

impl<T, R, M, C> TaskLifecycleService<T, R, M, C>
where
    T: TaskRepository,
    R: AgentRunRepository,
    M: CommentRepository,
    C: Clock + Send + Sync,
{
    /// Applies a status report from the external runner.
    ///
    /// Runs are matched by external identifier. A report that also carries
    /// the internal run identifier is matched by that when the runner calls
    /// back before `create_run` has returned; the external identifier is
    /// then recorded from the report.
    ///
    /// Reports for unknown runs, terminal runs, and repeated, stale, or
    /// regressing reports are logged and dropped. Only persistence failures
    /// are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when a repository operation fails.
    pub async fn reconcile_run_status(
        &self,
        report: RunStatusReport,
    ) -> TaskLifecycleResult<ReconcileOutcome> {
        match self.reconcile_locked(&report).await? {
            Reconciled::Done(outcome) => Ok(outcome),
            Reconciled::FollowUp { run, pending } => {
                let task = self.dispatch_queued(pending).await?;
                Ok(ReconcileOutcome::Applied { task, run })
            }
        }
    }

    async fn reconcile_locked(&self, report: &RunStatusReport) -> TaskLifecycleResult<Reconciled> {
        let external_run_id = report.external_run_id();
        let unknown = Reconciled::Done(ReconcileOutcome::Ignored(IgnoredReport::UnknownRun));
        let Some(located) = self.locate_run(report).await? else {
            warn!(%external_run_id, status = %report.status(), "report for unknown run dropped");
            return Ok(unknown);
        };

        let _guard = self.locks.acquire(located.task_id()).await;
        let Some((task, mut run)) = self.reload(located.id()).await? else {
            warn!(%external_run_id, "run or task vanished before reconciliation");
            return Ok(unknown);
        };
        match run.external_run_id() {
            Some(recorded) if recorded != external_run_id => {
                warn!(%external_run_id, %recorded, "report names another runner id, dropped");
                return Ok(unknown);
            }
            None if run.is_active() => {
                run.mark_dispatched(external_run_id.clone(), &*self.clock)?;
                debug!(run_id = %run.id(), %external_run_id, "runner id recorded from report");
            }
            _ => {}
        }
        self.apply_report(task, run, report).await
    }

    async fn locate_run(&self, report: &RunStatusReport) -> TaskLifecycleResult<Option<AgentRun>> {
        let external_run_id = report.external_run_id();
        if let Some(found) = self.runs.find_by_external_id(external_run_id).await? {
            return Ok(Some(found));
        }
        let Some(run_id) = report.run_id() else {
            return Ok(None);
        };
        let found = self.runs.find_by_id(run_id).await?;
        Ok(found.filter(|run| {
            run.external_run_id()
                .is_none_or(|recorded| recorded == external_run_id)
        }))
    }

    /// Applies a pull request status change reported by the source host.
    ///
    /// `merged` completes the task, `closed` returns it for rework (or to
    /// `todo`, per the event or configuration), and a reopened pull request
    /// moves the task back to `in_review` unless it is already done.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when a repository operation fails.
    pub async fn record_pull_request_event(
        &self,
        event: PullRequestEvent,
    ) -> TaskLifecycleResult<ReconcileOutcome> {
        let url = event.url();
        let Some(located) = self.runs.find_by_pull_request_url(url).await? else {
            warn!(%url, status = %event.status(), "event for unknown pull request dropped");
            return Ok(ReconcileOutcome::Ignored(IgnoredReport::UnknownPullRequest));
        };

        let _guard = self.locks.acquire(located.task_id()).await;
        let Some((mut task, mut run)) = self.reload(located.id()).await? else {
            return Ok(ReconcileOutcome::Ignored(IgnoredReport::UnknownPullRequest));
        };
        if task.current_run() != Some(run.id()) {
            debug!(
                task_id = %task.id(),
                run_id = %run.id(),
                "pull request event for superseded run dropped"
            );
            return Ok(ReconcileOutcome::Ignored(IgnoredReport::Superseded));
        }

        let to = match run.record_pull_request_status(event.status(), &*self.clock)? {
            PullRequestChange::Changed { to, .. } => to,
            PullRequestChange::Unchanged => {
                debug!(%url, status = %event.status(), "repeated pull request event dropped");
                return Ok(ReconcileOutcome::Ignored(IgnoredReport::Duplicate));
            }
            PullRequestChange::Rejected { from, to } => {
                warn!(%url, %from, %to, "pull request transition rejected");
                return Ok(ReconcileOutcome::Ignored(IgnoredReport::Regression));
            }
        };
        self.runs.update(&run).await?;

        if task.is_archived() {
            return Ok(ReconcileOutcome::Applied { task, run });
        }
        let from = task.status();
        match to {
            PullRequestStatus::Merged => task.complete(&*self.clock),
            PullRequestStatus::Closed => {
                let disposition = event
                    .closed_disposition()
                    .unwrap_or(self.config.closed_pull_request);
                task.reopen_for_rework(disposition, &*self.clock);
            }
            PullRequestStatus::Open => {
                task.return_to_review(&*self.clock);
            }
        }
        let stored = self.tasks.update(&task).await?;
        info!(
            task_id = %stored.id(),
            run_id = %run.id(),
            pr_status = %to,
            %from,
            to = %stored.status(),
            "pull request event applied"
        );
        Ok(ReconcileOutcome::Applied { task: stored, run })
    }

    /// Polls the runner for a run's status and reconciles the answer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::RunNotFound`],
    /// [`TaskLifecycleError::NotDispatched`],
    /// [`TaskLifecycleError::RunnerUnavailable`] when the status query fails,
    /// or a repository error.
    pub async fn refresh_run(&self, run_id: AgentRunId) -> TaskLifecycleResult<ReconcileOutcome> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(TaskLifecycleError::RunNotFound(run_id))?;
        if !run.is_active() {
            return Ok(ReconcileOutcome::Ignored(IgnoredReport::AlreadyTerminal));
        }
        let external_run_id = run
            .external_run_id()
            .ok_or(TaskLifecycleError::NotDispatched(run_id))?;
        let report = self
            .runner
            .run_status(external_run_id)
            .await
            .map_err(|source| TaskLifecycleError::RunnerUnavailable { run_id, source })?;
        self.reconcile_run_status(report).await
    }

    /// Polls every active, dispatched run. Per-run failures are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when active runs cannot be listed.
    pub async fn refresh_active_runs(&self) -> TaskLifecycleResult<Vec<ReconcileOutcome>> {
        let active = self.runs.list_active().await?;
        let mut outcomes = Vec::with_capacity(active.len());
        for run in active.iter().filter(|run| run.external_run_id().is_some()) {
            match self.refresh_run(run.id()).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(run_id = %run.id(), error = %err, "run refresh failed"),
            }
        }
        Ok(outcomes)
    }

    /// Force-fails every active run older than the configured maximum
    /// duration, applying the same task effects as a failure report.
    ///
    /// Returns the expired runs.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when a repository operation fails.
    pub async fn expire_stale_runs(&self) -> TaskLifecycleResult<Vec<AgentRun>> {
        let max_duration = self.config.max_run_duration();
        let candidates = self.runs.list_active().await?;
        let mut expired = Vec::new();
        for candidate in candidates {
            if !candidate.is_stale(self.clock.utc(), max_duration) {
                continue;
            }
            let Some((run, follow_up)) = self.expire_run(&candidate, max_duration).await? else {
                continue;
            };
            if let Some(pending) = follow_up {
                self.dispatch_queued(pending).await?;
            }
            expired.push(run);
        }
        Ok(expired)
    }

    async fn expire_run(
        &self,
        candidate: &AgentRun,
        max_duration: TimeDelta,
    ) -> TaskLifecycleResult<Option<(AgentRun, Option<PendingDispatch>)>> {
        let _guard = self.locks.acquire(candidate.task_id()).await;
        let Some((task, mut run)) = self.reload(candidate.id()).await? else {
            return Ok(None);
        };
        let message = format!(
            "run exceeded the maximum duration of {}s",
            self.config.max_run_duration_secs
        );
        if !run.is_stale(self.clock.utc(), max_duration) || !run.force_fail(message, &*self.clock) {
            return Ok(None);
        }
        self.runs.update(&run).await?;
        warn!(
            task_id = %task.id(),
            run_id = %run.id(),
            run_type = %run.run_type(),
            "stale run expired"
        );
        if !Self::is_current(&task, &run) {
            return Ok(Some((run, None)));
        }
        let follow_up = match self.finish_task_for_run(task, &run).await? {
            Aftermath::Settled(_) => None,
            Aftermath::FollowUp(pending) => Some(pending),
        };
        Ok(Some((run, follow_up)))
    }

    pub(super) async fn reload(
        &self,
        run_id: AgentRunId,
    ) -> TaskLifecycleResult<Option<(Task, AgentRun)>> {
        let Some(run) = self.runs.find_by_id(run_id).await? else {
            return Ok(None);
        };
        let task = self.tasks.find_by_id(run.task_id()).await?;
        Ok(task.map(|found| (found, run)))
    }

    pub(super) fn is_current(task: &Task, run: &AgentRun) -> bool {
        let pointer = match run.run_type() {
            RunType::Planning => task.current_planning_run(),
            RunType::Implementation => task.current_run(),
        };
        pointer == Some(run.id())
    }

    async fn apply_report(
        &self,
        task: Task,
        mut run: AgentRun,
        report: &RunStatusReport,
    ) -> TaskLifecycleResult<Reconciled> {
        let external_run_id = report.external_run_id();
        if run.is_active() && !Self::is_current(&task, &run) {
            debug!(%external_run_id, "report for superseded run dropped");
            let superseded = ReconcileOutcome::Ignored(IgnoredReport::Superseded);
            return Ok(Reconciled::Done(superseded));
        }

        let transition = match run.apply_report(report, &*self.clock) {
            ReportDisposition::Applied(transition) => transition,
            ReportDisposition::Ignored(reason) => {
                debug!(%external_run_id, reason = reason.as_str(), "report dropped");
                return Ok(Reconciled::Done(ReconcileOutcome::Ignored(reason)));
            }
        };
        self.runs.update(&run).await?;
        info!(
            task_id = %task.id(),
            run_id = %run.id(),
            %external_run_id,
            from = %transition.from,
            to = %transition.to,
            "run status reconciled"
        );

        if !transition.reached_terminal() {
            return Ok(Reconciled::Done(ReconcileOutcome::Applied { task, run }));
        }
        Ok(match self.finish_task_for_run(task, &run).await? {
            Aftermath::Settled(stored) => {
                Reconciled::Done(ReconcileOutcome::Applied { task: stored, run })
            }
            Aftermath::FollowUp(pending) => Reconciled::FollowUp { run, pending },
        })
    }

    /// Applies a terminal run's effects to its task and prepares queued
    /// follow-up work.
    async fn finish_task_for_run(
        &self,
        mut task: Task,
        run: &AgentRun,
    ) -> TaskLifecycleResult<Aftermath> {
        if task.is_archived() {
            return Ok(Aftermath::Settled(task));
        }
        match run.run_type() {
            RunType::Planning => self.finish_planning(&mut task, run),
            RunType::Implementation => self.finish_implementation(&mut task, run),
        }
        let stored = self.tasks.update(&task).await?;
        info!(
            task_id = %stored.id(),
            status = %stored.status(),
            plan_status = ?stored.plan_status(),
            "task updated from run outcome"
        );

        if run.run_type() == RunType::Implementation && !stored.queued_instructions().is_empty() {
            return self.prepare_queued_follow_up(stored).await;
        }
        Ok(Aftermath::Settled(stored))
    }

    fn finish_planning(&self, task: &mut Task, run: &AgentRun) {
        match run.status() {
            RunStatus::Finished => {
                match run.summary().map(str::trim).filter(|plan| !plan.is_empty()) {
                    Some(plan) => task.record_plan(plan, &*self.clock),
                    None => task.fail_planning(MISSING_PLAN_MESSAGE, &*self.clock),
                }
            }
            RunStatus::Failed => {
                let message = run.error_message().unwrap_or("planning run failed");
                task.fail_planning(message, &*self.clock);
            }
            RunStatus::Creating | RunStatus::Running => {}
        }
    }

    fn finish_implementation(&self, task: &mut Task, run: &AgentRun) {
        if task.status() == TaskStatus::Done {
            debug!(
                task_id = %task.id(),
                run_id = %run.id(),
                "task already done, run outcome recorded only"
            );
            return;
        }
        let has_open_pull_request = run
            .pull_request()
            .is_some_and(|pull_request| pull_request.status() == PullRequestStatus::Open);
        match run.status() {
            RunStatus::Finished if has_open_pull_request => task.enter_review(&*self.clock),
            RunStatus::Finished => {
                task.finish_without_changes(self.config.no_changes_policy, &*self.clock);
            }
            RunStatus::Failed => {
                let message = run.error_message().unwrap_or("implementation run failed");
                task.fail_implementation(message, &*self.clock);
            }
            RunStatus::Creating | RunStatus::Running => {}
        }
    }

    async fn prepare_queued_follow_up(&self, mut task: Task) -> TaskLifecycleResult<Aftermath> {
        let repository = match self.repository_links.resolve(task.workspace_id()).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                warn!(task_id = %task.id(), "queued instructions kept, no linked repository");
                return Ok(Aftermath::Settled(task));
            }
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    error = %err,
                    "queued instructions kept, repository lookup failed"
                );
                return Ok(Aftermath::Settled(task));
            }
        };
        if !task.is_assigned_to_agent() {
            return Ok(Aftermath::Settled(task));
        }

        let start = self.follow_up_start(&task).await?;
        let instructions = task
            .drain_instructions(&*self.clock)
            .into_iter()
            .map(|queued| queued.body)
            .collect::<Vec<_>>()
            .join("\n\n");
        let drained = self.tasks.update(&task).await?;
        let pending = self
            .prepare_implementation(drained, repository, Some(instructions), start)
            .await?;
        Ok(Aftermath::FollowUp(pending))
    }

    async fn dispatch_queued(&self, pending: PendingDispatch) -> TaskLifecycleResult<Task> {
        let task_id = pending.task_id();
        match self.dispatch(pending).await {
            Ok(started) => {
                info!(
                    %task_id,
                    run_id = %started.run.id(),
                    "follow-up run started from queued instructions"
                );
                Ok(started.task)
            }
            Err(TaskLifecycleError::RunnerUnavailable { run_id, source }) => {
                warn!(%task_id, %run_id, error = %source, "follow-up dispatch failed");
                self.load_task(task_id).await
            }
            Err(err) => Err(err),
        }
    }
}
