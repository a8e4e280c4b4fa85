//! End-to-end lifecycle scenarios against in-memory adapters.

use super::helpers::{Wiring, report, wiring};
use eyre::{bail, ensure};
use rstest::rstest;
use tasklane::agent_run::{
    domain::{PullRequest, PullRequestEvent, PullRequestStatus, RunStatus},
    ports::AgentRunnerError,
};
use tasklane::task::{
    domain::{PlanStatus, TaskStatus},
    services::{ReconcileOutcome, TaskLifecycleError},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn planning_run_produces_ready_plan(wiring: Wiring) -> eyre::Result<()> {
    let task = wiring.agent_task("Add rate limiting").await;

    let started = wiring.service.request_planning_run(task.id()).await?;
    ensure!(started.task.plan_status() == Some(PlanStatus::Generating));

    let outcome = wiring
        .service
        .reconcile_run_status(report(&started.run, RunStatus::Finished).with_summary("plan ready"))
        .await?;
    let ReconcileOutcome::Applied { task: planned, run } = outcome else {
        bail!("finished planning report should apply");
    };
    ensure!(planned.plan_status() == Some(PlanStatus::Ready));
    ensure!(planned.plan() == Some("plan ready"));
    ensure!(planned.status() == TaskStatus::Todo);
    ensure!(run.status() == RunStatus::Finished);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plan_then_implement_then_merge(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Add rate limiting").await;
    let planning = wiring.service.request_planning_run(task.id()).await?;
    wiring
        .service
        .reconcile_run_status(
            report(&planning.run, RunStatus::Finished).with_summary("1. Add middleware"),
        )
        .await?;

    let started = wiring.service.request_implementation_run(task.id()).await?;
    ensure!(started.task.status() == TaskStatus::InProgress);
    let dispatches = wiring.runner.dispatches();
    let Some(dispatch) = dispatches.last() else {
        bail!("implementation run was not dispatched");
    };
    ensure!(dispatch.prompt.contains("1. Add middleware"), "plan feeds the prompt");

    let pull_request = PullRequest::from_parts("https://x/pr/1", 1)?;
    let finished = wiring
        .service
        .reconcile_run_status(
            report(&started.run, RunStatus::Finished).with_pull_request(pull_request.clone()),
        )
        .await?;
    let ReconcileOutcome::Applied { task: in_review, run } = finished else {
        bail!("finished implementation report should apply");
    };
    ensure!(in_review.status() == TaskStatus::InReview);
    ensure!(run.pull_request().map(PullRequest::status) == Some(PullRequestStatus::Open));

    let merged = wiring
        .service
        .record_pull_request_event(PullRequestEvent::new(
            pull_request.url().clone(),
            PullRequestStatus::Merged,
        ))
        .await?;
    let ReconcileOutcome::Applied { task: done, .. } = merged else {
        bail!("merge event should apply");
    };
    ensure!(done.status() == TaskStatus::Done);
    ensure!(done.completed_at().is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_implementation_returns_task_to_todo(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Upgrade dependencies").await;
    let started = wiring.service.request_implementation_run(task.id()).await?;

    let outcome = wiring
        .service
        .reconcile_run_status(report(&started.run, RunStatus::Failed).with_error("timeout"))
        .await?;
    let ReconcileOutcome::Applied { task: reverted, .. } = outcome else {
        bail!("failed report should apply");
    };
    ensure!(reverted.status() == TaskStatus::Todo);
    ensure!(reverted.error_message() == Some("timeout"));

    let retried = wiring.service.request_implementation_run(task.id()).await?;
    ensure!(retried.task.status() == TaskStatus::InProgress);
    ensure!(retried.task.error_message().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_terminal_report_changes_nothing(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Fix flaky test").await;
    let started = wiring.service.request_implementation_run(task.id()).await?;
    let failed = report(&started.run, RunStatus::Failed).with_error("timeout");

    wiring.service.reconcile_run_status(failed.clone()).await?;
    let task_once = wiring.service.find_task(task.id()).await?;
    let runs_once = wiring.service.runs_for_task(task.id()).await?;

    let again = wiring.service.reconcile_run_status(failed).await?;
    ensure!(matches!(again, ReconcileOutcome::Ignored(_)));
    ensure!(wiring.service.find_task(task.id()).await? == task_once);
    ensure!(wiring.service.runs_for_task(task.id()).await? == runs_once);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn implementation_without_repository_is_refused(wiring: Wiring) -> eyre::Result<()> {
    let task = wiring.agent_task("Rewrite docs").await;
    let result = wiring.service.request_implementation_run(task.id()).await;
    ensure!(matches!(result, Err(TaskLifecycleError::MissingRepository(id)) if id == task.id()));

    let unchanged = wiring
        .service
        .find_task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task disappeared"))?;
    ensure!(unchanged == task);
    ensure!(wiring.service.runs_for_task(task.id()).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_implementation_request_conflicts(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Split module").await;
    let first = wiring.service.request_implementation_run(task.id()).await?;
    wiring
        .service
        .reconcile_run_status(report(&first.run, RunStatus::Running))
        .await?;
    let before = wiring.service.runs_for_task(task.id()).await?;

    let second = wiring.service.request_implementation_run(task.id()).await;
    ensure!(matches!(second, Err(TaskLifecycleError::Conflict { .. })));
    ensure!(wiring.service.runs_for_task(task.id()).await? == before);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn runner_outage_is_retryable(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Tune cache").await;
    wiring
        .runner
        .fail_with(AgentRunnerError::Unavailable("connection refused".to_owned()));

    let refused = wiring.service.request_implementation_run(task.id()).await;
    ensure!(matches!(refused, Err(TaskLifecycleError::RunnerUnavailable { .. })));
    let after_refusal = wiring
        .service
        .find_task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task disappeared"))?;
    ensure!(after_refusal.status() == TaskStatus::Todo);
    ensure!(after_refusal.error_message().is_some());

    wiring.runner.recover();
    let started = wiring.service.request_implementation_run(task.id()).await?;
    ensure!(started.task.status() == TaskStatus::InProgress);
    ensure!(wiring.service.runs_for_task(task.id()).await?.len() == 2);
    Ok(())
}
