//! When steps for task agent lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use tasklane::agent_run::domain::{
    PullRequest, PullRequestEvent, PullRequestStatus, RunStatus, RunStatusReport,
};
use tasklane::task::{
    domain::{CommentAuthor, UserId},
    services::ReconcileOutcome,
};

#[when("a planning run is requested")]
fn planning_requested(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?.id();
    let started =
        run_async(world.service.request_planning_run(task_id)).wrap_err("request planning run")?;
    world.task = Some(started.task);
    world.last_run = Some(started.run);
    Ok(())
}

#[when("an implementation run is requested")]
fn implementation_requested(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?.id();
    let result = run_async(world.service.request_implementation_run(task_id));
    if let Ok(started) = &result {
        world.task = Some(started.task.clone());
        world.last_run = Some(started.run.clone());
    }
    world.last_request = Some(result);
    Ok(())
}

#[when(r#"the runner reports the run finished with summary "{summary}""#)]
fn finished_with_summary(world: &mut LifecycleWorld, summary: String) -> Result<(), eyre::Report> {
    let report = base_report(world, RunStatus::Finished)?.with_summary(summary);
    world.apply(report)
}

#[when(r#"the runner reports the run finished with pull request "{url}" #{number:u64}"#)]
fn finished_with_pull_request(
    world: &mut LifecycleWorld,
    url: String,
    number: u64,
) -> Result<(), eyre::Report> {
    let pull_request = PullRequest::from_parts(&url, number).wrap_err("build pull request")?;
    world.pull_request = Some(pull_request.clone());
    let report = base_report(world, RunStatus::Finished)?.with_pull_request(pull_request);
    world.apply(report)
}

#[when(r#"the runner reports the run failed with error "{error}""#)]
fn failed_with_error(world: &mut LifecycleWorld, error: String) -> Result<(), eyre::Report> {
    let report = base_report(world, RunStatus::Failed)?.with_error(error);
    world.apply(report)
}

#[when(r#"the pull request is "{transition}""#)]
fn pull_request_event(world: &mut LifecycleWorld, transition: String) -> Result<(), eyre::Report> {
    let status = PullRequestStatus::try_from(transition.as_str())
        .map_err(|err| eyre::eyre!("invalid pull request status in scenario: {err}"))?;
    let url = world
        .pull_request
        .as_ref()
        .map(|pull_request| pull_request.url().clone())
        .ok_or_else(|| eyre::eyre!("missing pull request in scenario world"))?;
    match run_async(world.service.record_pull_request_event(PullRequestEvent::new(url, status)))? {
        ReconcileOutcome::Applied { task, run } => {
            world.task = Some(task);
            world.last_run = Some(run);
            Ok(())
        }
        ReconcileOutcome::Ignored(reason) => Err(eyre::eyre!("event ignored: {reason:?}")),
    }
}

#[when(r#"a user comments "{body}""#)]
fn user_comments(world: &mut LifecycleWorld, body: String) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?.id();
    let author = CommentAuthor::User(UserId::new("reviewer-1").wrap_err("build user id")?);
    let posted =
        run_async(world.service.add_comment(task_id, author, body)).wrap_err("add comment")?;
    world.last_comment = Some(posted);
    Ok(())
}

fn base_report(world: &LifecycleWorld, status: RunStatus) -> Result<RunStatusReport, eyre::Report> {
    let external_run_id = world
        .last_run()?
        .external_run_id()
        .cloned()
        .ok_or_else(|| eyre::eyre!("run was not dispatched"))?;
    Ok(RunStatusReport::new(external_run_id, status))
}
