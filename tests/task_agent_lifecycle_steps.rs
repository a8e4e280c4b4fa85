//! Behaviour tests for the task agent lifecycle.

#[path = "task_agent_lifecycle_steps/mod.rs"]
mod task_agent_lifecycle_steps_defs;

use rstest_bdd_macros::scenario;
use task_agent_lifecycle_steps_defs::world::{LifecycleWorld, world};

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Planning run produces a ready plan"
)]
#[tokio::test(flavor = "multi_thread")]
async fn planning_run_produces_ready_plan(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Implementation run opens a pull request for review"
)]
#[tokio::test(flavor = "multi_thread")]
async fn implementation_run_opens_pull_request(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Merged pull request completes the task"
)]
#[tokio::test(flavor = "multi_thread")]
async fn merged_pull_request_completes_task(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Failed implementation returns the task to todo"
)]
#[tokio::test(flavor = "multi_thread")]
async fn failed_implementation_returns_to_todo(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Implementation without a linked repository is refused"
)]
#[tokio::test(flavor = "multi_thread")]
async fn implementation_without_repository_is_refused(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Second implementation request conflicts with the running one"
)]
#[tokio::test(flavor = "multi_thread")]
async fn second_implementation_request_conflicts(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_agent_lifecycle.feature",
    name = "Agent mention on a task in review starts a follow-up run"
)]
#[tokio::test(flavor = "multi_thread")]
async fn agent_mention_starts_follow_up(world: LifecycleWorld) {
    let _ = world;
}
