//! Given steps for task agent lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tasklane::agent_run::domain::{PullRequest, RunStatus, RunStatusReport};
use tasklane::task::{
    domain::{Assignee, LinkedRepository},
    services::CreateTaskRequest,
};

#[given(r#"a workspace with a linked repository "{full_name}""#)]
fn workspace_with_repository(
    world: &mut LifecycleWorld,
    full_name: String,
) -> Result<(), eyre::Report> {
    let repository = LinkedRepository::from_parts("github", &full_name, "main")
        .wrap_err("build linked repository")?;
    world
        .links
        .link(world.workspace_id, repository)
        .wrap_err("link repository to workspace")?;
    Ok(())
}

#[given(r#"a todo task "{title}" assigned to the agent"#)]
fn agent_task(world: &mut LifecycleWorld, title: String) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(world.workspace_id, title).with_assignee(Assignee::Agent);
    let created = run_async(world.service.create_task(request)).wrap_err("create agent task")?;
    world.task = Some(created);
    Ok(())
}

#[given(r#"the task has a ready plan "{plan}""#)]
fn task_has_ready_plan(world: &mut LifecycleWorld, plan: String) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?.id();
    let started =
        run_async(world.service.request_planning_run(task_id)).wrap_err("request planning run")?;
    let external_run_id = started
        .run
        .external_run_id()
        .cloned()
        .ok_or_else(|| eyre::eyre!("planning run was not dispatched"))?;
    world.apply(RunStatusReport::new(external_run_id, RunStatus::Finished).with_summary(plan))
}

#[given("the task has an implementation run in progress")]
fn implementation_in_progress(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    start_implementation(world)?;
    let external_run_id = dispatched_id(world)?;
    world.apply(RunStatusReport::new(external_run_id, RunStatus::Running))
}

#[given(r#"the task is in review with pull request "{url}" #{number:u64}"#)]
fn task_in_review(
    world: &mut LifecycleWorld,
    url: String,
    number: u64,
) -> Result<(), eyre::Report> {
    start_implementation(world)?;
    let pull_request = PullRequest::from_parts(&url, number).wrap_err("build pull request")?;
    let external_run_id = dispatched_id(world)?;
    world.pull_request = Some(pull_request.clone());
    world.apply(
        RunStatusReport::new(external_run_id, RunStatus::Finished).with_pull_request(pull_request),
    )
}

fn start_implementation(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?.id();
    let started = run_async(world.service.request_implementation_run(task_id))
        .wrap_err("request implementation run")?;
    world.task = Some(started.task);
    world.last_run = Some(started.run);
    Ok(())
}

fn dispatched_id(
    world: &LifecycleWorld,
) -> Result<tasklane::agent_run::domain::ExternalRunId, eyre::Report> {
    world
        .last_run()?
        .external_run_id()
        .cloned()
        .ok_or_else(|| eyre::eyre!("implementation run was not dispatched"))
}
