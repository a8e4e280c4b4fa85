//! Then steps for task agent lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use rstest_bdd_macros::then;
use tasklane::agent_run::domain::{PullRequest, PullRequestStatus};
use tasklane::task::{
    domain::{PlanStatus, TaskStatus},
    services::{CommentOutcome, TaskLifecycleError},
};

#[then(r#"the plan status is "{status}""#)]
fn plan_status_is(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = PlanStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected plan status in scenario: {err}"))?;
    let task = world.current_task()?;
    if task.plan_status() != Some(expected) {
        return Err(eyre::eyre!(
            "expected plan status {expected}, found {:?}",
            task.plan_status()
        ));
    }
    Ok(())
}

#[then(r#"the task plan is "{plan}""#)]
fn task_plan_is(world: &LifecycleWorld, plan: String) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    if task.plan() != Some(plan.as_str()) {
        return Err(eyre::eyre!("expected plan {plan:?}, found {:?}", task.plan()));
    }
    Ok(())
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected task status in scenario: {err}"))?;
    let task = world.current_task()?;
    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            task.status()
        ));
    }
    Ok(())
}

#[then(r#"the task error message is "{message}""#)]
fn task_error_message_is(world: &LifecycleWorld, message: String) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    if task.error_message() != Some(message.as_str()) {
        return Err(eyre::eyre!(
            "expected error message {message:?}, found {:?}",
            task.error_message()
        ));
    }
    Ok(())
}

#[then("the task has a completion time")]
fn task_has_completion_time(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    if world.current_task()?.completed_at().is_none() {
        return Err(eyre::eyre!("expected completed_at to be set"));
    }
    Ok(())
}

#[then(r#"the current pull request is "{status}""#)]
fn current_pull_request_is(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = PullRequestStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected pull request status in scenario: {err}"))?;
    let found = world.last_run()?.pull_request().map(PullRequest::status);
    if found != Some(expected) {
        return Err(eyre::eyre!("expected pull request {expected}, found {found:?}"));
    }
    Ok(())
}

#[then("the request fails with a missing repository error")]
fn request_fails_missing_repository(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_request
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing request result"))?;
    if !matches!(result, Err(TaskLifecycleError::MissingRepository(_))) {
        return Err(eyre::eyre!("expected MissingRepository error, got {result:?}"));
    }
    Ok(())
}

#[then("the request fails with a conflict error")]
fn request_fails_conflict(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_request
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing request result"))?;
    if !matches!(result, Err(TaskLifecycleError::Conflict { .. })) {
        return Err(eyre::eyre!("expected Conflict error, got {result:?}"));
    }
    Ok(())
}

#[then("the task has {count:u64} agent runs")]
fn task_has_runs(world: &LifecycleWorld, count: u64) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?.id();
    let runs = run_async(world.service.runs_for_task(task_id))?;
    if u64::try_from(runs.len())? != count {
        return Err(eyre::eyre!("expected {count} runs, found {}", runs.len()));
    }
    Ok(())
}

#[then(r#"a follow-up run was started with instructions "{text}""#)]
fn follow_up_started(world: &LifecycleWorld, text: String) -> Result<(), eyre::Report> {
    let posted = world
        .last_comment
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing posted comment"))?;
    let CommentOutcome::RunStarted(run) = &posted.outcome else {
        return Err(eyre::eyre!("expected a started run, got {:?}", posted.outcome));
    };
    if run.instructions() != Some(text.as_str()) {
        return Err(eyre::eyre!(
            "expected instructions {text:?}, found {:?}",
            run.instructions()
        ));
    }
    Ok(())
}
