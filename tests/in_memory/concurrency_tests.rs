//! Concurrent requests against one task.

use std::sync::Arc;

use super::helpers::{Wiring, report, wiring};
use eyre::ensure;
use rstest::rstest;
use tasklane::agent_run::domain::{RunStatus, RunType};
use tasklane::task::services::{StartedRun, TaskLifecycleError, TaskLifecycleResult};
use tokio::task::JoinHandle;

const CONTENDERS: usize = 8;

fn tally(results: Vec<TaskLifecycleResult<StartedRun>>) -> eyre::Result<usize> {
    let mut started = 0_usize;
    for result in results {
        match result {
            Ok(_) => started += 1,
            Err(TaskLifecycleError::Conflict { .. }) => {}
            Err(other) => eyre::bail!("unexpected error: {other}"),
        }
    }
    Ok(started)
}

async fn join_all(
    handles: Vec<JoinHandle<TaskLifecycleResult<StartedRun>>>,
) -> Vec<TaskLifecycleResult<StartedRun>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.expect("request task should not panic"));
    }
    results
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_implementation_requests_start_one_run(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Parallelise exports").await;

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let service = Arc::clone(&wiring.service);
            let task_id = task.id();
            tokio::spawn(async move { service.request_implementation_run(task_id).await })
        })
        .collect();
    let started = tally(join_all(handles).await)?;
    ensure!(started == 1, "expected exactly one started run, got {started}");

    let runs = wiring.service.runs_for_task(task.id()).await?;
    let active = runs.iter().filter(|run| run.is_active()).count();
    ensure!(runs.len() == 1);
    ensure!(active == 1);
    ensure!(wiring.runner.dispatches().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn planning_and_implementation_race_independently(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Rework onboarding").await;

    let mut planning = Vec::new();
    let mut implementation = Vec::new();
    for _ in 0..CONTENDERS {
        let for_plan = Arc::clone(&wiring.service);
        let for_build = Arc::clone(&wiring.service);
        let task_id = task.id();
        planning.push(tokio::spawn(async move {
            for_plan.request_planning_run(task_id).await
        }));
        implementation.push(tokio::spawn(async move {
            for_build.request_implementation_run(task_id).await
        }));
    }
    ensure!(tally(join_all(planning).await)? == 1);
    ensure!(tally(join_all(implementation).await)? == 1);

    let runs = wiring.service.runs_for_task(task.id()).await?;
    for run_type in [RunType::Planning, RunType::Implementation] {
        let active = runs
            .iter()
            .filter(|run| run.run_type() == run_type && run.is_active())
            .count();
        ensure!(active == 1, "{run_type} has {active} active runs");
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_reports_apply_once(wiring: Wiring) -> eyre::Result<()> {
    wiring.link_repository();
    let task = wiring.agent_task("Cache invalidation").await;
    let started = wiring.service.request_implementation_run(task.id()).await?;
    let failed = report(&started.run, RunStatus::Failed).with_error("timeout");

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let service = Arc::clone(&wiring.service);
            let delivery = failed.clone();
            tokio::spawn(async move { service.reconcile_run_status(delivery).await })
        })
        .collect();
    let mut applied = 0_usize;
    for handle in handles {
        let outcome = handle.await.expect("report task should not panic")?;
        if matches!(outcome, tasklane::task::services::ReconcileOutcome::Applied { .. }) {
            applied += 1;
        }
    }
    ensure!(applied == 1, "expected one applied report, got {applied}");

    let current = wiring
        .service
        .find_task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task disappeared"))?;
    ensure!(current.error_message() == Some("timeout"));
    Ok(())
}
