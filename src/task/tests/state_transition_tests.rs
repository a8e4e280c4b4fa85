//! Unit tests for task status changes.

use crate::agent_run::domain::{ABANDONED_MESSAGE, AgentRunId};
use crate::task::domain::{
    Assignee, ClosedPullRequestDisposition, CommentId, ManualMoveGuard, NewTask, NoChangesPolicy,
    PlanStatus, QueuedInstruction, Task, TaskDomainError, TaskStatus, TransitionRejection,
    WorkspaceId,
};
use eyre::{bail, ensure};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

const ALL_STATUSES: [TaskStatus; 5] = [
    TaskStatus::Backlog,
    TaskStatus::Todo,
    TaskStatus::InProgress,
    TaskStatus::InReview,
    TaskStatus::Done,
];

const UNGUARDED: ManualMoveGuard = ManualMoveGuard {
    has_active_run: false,
    current_run_has_pull_request: true,
};

#[fixture]
fn clock() -> DefaultClock {
    DefaultClock
}

fn task_in(status: TaskStatus, clock: &DefaultClock) -> Task {
    Task::new(
        NewTask {
            workspace_id: WorkspaceId::new(),
            title: "Wire the retry budget".to_owned(),
            description: None,
            prompt: None,
            status,
            assignee: Some(Assignee::Agent),
            agent_type: None,
            parent_id: None,
            order_index: 0,
        },
        clock,
    )
    .expect("valid task")
}

#[rstest]
fn every_move_is_allowed_without_guards(clock: DefaultClock) -> eyre::Result<()> {
    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            let mut task = task_in(from, &clock);
            let changed = task.move_to(to, UNGUARDED, &clock)?;
            ensure!(changed == (from != to), "{from} -> {to} reported changed={changed}");
            ensure!(task.status() == to, "{from} -> {to} ended at {}", task.status());
        }
    }
    Ok(())
}

#[rstest]
#[case(TaskStatus::Todo)]
#[case(TaskStatus::InProgress)]
#[case(TaskStatus::InReview)]
fn moving_to_done_with_an_active_run_is_rejected(
    clock: DefaultClock,
    #[case] from: TaskStatus,
) -> eyre::Result<()> {
    let mut task = task_in(from, &clock);
    let guard = ManualMoveGuard {
        has_active_run: true,
        current_run_has_pull_request: true,
    };
    match task.move_to(TaskStatus::Done, guard, &clock) {
        Err(TaskDomainError::InvalidStatusTransition {
            from: reported,
            to: TaskStatus::Done,
            reason: TransitionRejection::ActiveRun,
            ..
        }) => ensure!(reported == from),
        other => bail!("expected active-run rejection, got {other:?}"),
    }
    ensure!(task.status() == from, "rejected move must not change status");
    Ok(())
}

#[rstest]
fn moving_to_review_requires_a_pull_request(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::InProgress, &clock);
    let guard = ManualMoveGuard {
        has_active_run: false,
        current_run_has_pull_request: false,
    };
    let result = task.move_to(TaskStatus::InReview, guard, &clock);
    ensure!(matches!(
        result,
        Err(TaskDomainError::InvalidStatusTransition {
            reason: TransitionRejection::MissingPullRequest,
            ..
        })
    ));
    ensure!(task.status() == TaskStatus::InProgress);
    Ok(())
}

#[rstest]
fn moving_other_columns_ignores_the_active_run_guard(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::InProgress, &clock);
    let guard = ManualMoveGuard {
        has_active_run: true,
        current_run_has_pull_request: false,
    };
    ensure!(task.move_to(TaskStatus::Backlog, guard, &clock)?);
    ensure!(task.status() == TaskStatus::Backlog);
    Ok(())
}

#[rstest]
fn completion_timestamp_follows_done(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::InReview, &clock);
    task.move_to(TaskStatus::Done, UNGUARDED, &clock)?;
    let Some(completed_at) = task.completed_at() else {
        bail!("done task must record completedAt");
    };
    ensure!(completed_at <= task.updated_at());

    task.move_to(TaskStatus::Todo, UNGUARDED, &clock)?;
    ensure!(task.completed_at().is_none(), "leaving done clears completedAt");
    Ok(())
}

#[rstest]
fn archived_task_refuses_moves(clock: DefaultClock) {
    let mut task = task_in(TaskStatus::Todo, &clock);
    assert!(task.archive(&clock));
    assert!(!task.archive(&clock), "second archive is a no-op");
    let result = task.move_to(TaskStatus::Backlog, UNGUARDED, &clock);
    assert_eq!(result, Err(TaskDomainError::TaskArchived(task.id())));
}

#[rstest]
fn planning_cycle_updates_plan_fields_only(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Todo, &clock);
    let run_id = AgentRunId::new();
    task.begin_planning(run_id, &clock)?;
    ensure!(task.plan_status() == Some(PlanStatus::Generating));
    ensure!(task.current_planning_run() == Some(run_id));

    task.record_plan("1. Add a budget\n2. Test it", &clock);
    ensure!(task.plan_status() == Some(PlanStatus::Ready));
    ensure!(task.plan() == Some("1. Add a budget\n2. Test it"));
    ensure!(task.plan_generated_at().is_some());
    ensure!(task.status() == TaskStatus::Todo, "planning never moves the task");
    Ok(())
}

#[rstest]
fn failed_planning_keeps_status(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Backlog, &clock);
    task.begin_planning(AgentRunId::new(), &clock)?;
    task.fail_planning("runner crashed", &clock);
    ensure!(task.plan_status() == Some(PlanStatus::Failed));
    ensure!(task.error_message() == Some("runner crashed"));
    ensure!(task.status() == TaskStatus::Backlog);
    Ok(())
}

#[rstest]
fn implementation_requires_agent_assignment(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Todo, &clock);
    task.reassign(Some(Assignee::User), &clock)?;
    let result = task.begin_implementation(AgentRunId::new(), &clock);
    ensure!(result == Err(TaskDomainError::NotAssignedToAgent(task.id())));
    ensure!(task.status() == TaskStatus::Todo);
    Ok(())
}

#[rstest]
fn implementation_outcomes_move_the_task(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Todo, &clock);
    task.begin_implementation(AgentRunId::new(), &clock)?;
    ensure!(task.status() == TaskStatus::InProgress);

    task.enter_review(&clock);
    ensure!(task.status() == TaskStatus::InReview);

    task.reopen_for_rework(ClosedPullRequestDisposition::Rework, &clock);
    ensure!(task.status() == TaskStatus::InProgress);

    task.fail_implementation("timeout", &clock);
    ensure!(task.status() == TaskStatus::Todo);
    ensure!(task.error_message() == Some("timeout"));
    Ok(())
}

#[rstest]
#[case(NoChangesPolicy::RevertToTodo, TaskStatus::Todo)]
#[case(NoChangesPolicy::MarkDone, TaskStatus::Done)]
fn no_changes_policy_decides_the_column(
    clock: DefaultClock,
    #[case] policy: NoChangesPolicy,
    #[case] expected: TaskStatus,
) {
    let mut task = task_in(TaskStatus::InProgress, &clock);
    task.finish_without_changes(policy, &clock);
    assert_eq!(task.status(), expected);
    assert_eq!(task.completed_at().is_some(), expected == TaskStatus::Done);
}

#[rstest]
fn reopened_pull_request_does_not_undo_done(clock: DefaultClock) {
    let mut task = task_in(TaskStatus::InReview, &clock);
    task.complete(&clock);
    assert!(!task.return_to_review(&clock));
    assert_eq!(task.status(), TaskStatus::Done);

    let mut reworked = task_in(TaskStatus::InProgress, &clock);
    assert!(reworked.return_to_review(&clock));
    assert_eq!(reworked.status(), TaskStatus::InReview);
}

#[rstest]
fn failed_dispatch_restores_prior_status(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Todo, &clock);
    let prior = task.status_snapshot();
    task.begin_implementation(AgentRunId::new(), &clock)?;
    task.restore_after_failed_dispatch(prior, "agent runner unavailable", &clock);
    ensure!(task.status() == TaskStatus::Todo);
    ensure!(task.completed_at().is_none());
    ensure!(task.error_message() == Some("agent runner unavailable"));
    Ok(())
}

#[rstest]
fn failed_dispatch_keeps_the_original_completion_time(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::InReview, &clock);
    task.complete(&clock);
    let Some(completed_at) = task.completed_at() else {
        bail!("done task must record completedAt");
    };
    let prior = task.status_snapshot();
    ensure!(prior.status() == TaskStatus::Done);

    task.begin_implementation(AgentRunId::new(), &clock)?;
    ensure!(task.completed_at().is_none());
    task.restore_after_failed_dispatch(prior, "agent runner unavailable", &clock);

    ensure!(task.status() == TaskStatus::Done);
    ensure!(task.completed_at() == Some(completed_at));
    Ok(())
}

#[rstest]
fn queued_instructions_drain_in_order(clock: DefaultClock) {
    let mut task = task_in(TaskStatus::InProgress, &clock);
    for body in ["first", "second"] {
        task.queue_instruction(
            QueuedInstruction {
                comment_id: CommentId::new(),
                body: body.to_owned(),
            },
            &clock,
        );
    }
    let drained: Vec<String> = task
        .drain_instructions(&clock)
        .into_iter()
        .map(|queued| queued.body)
        .collect();
    assert_eq!(drained, vec!["first".to_owned(), "second".to_owned()]);
    assert!(task.queued_instructions().is_empty());
}

#[rstest]
fn abandoning_implementation_clears_queue_and_returns_to_todo(
    clock: DefaultClock,
) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Todo, &clock);
    task.begin_implementation(AgentRunId::new(), &clock)?;
    task.queue_instruction(
        QueuedInstruction {
            comment_id: CommentId::new(),
            body: "also update docs".to_owned(),
        },
        &clock,
    );
    task.abandon_implementation(&clock);
    ensure!(task.queued_instructions().is_empty());
    ensure!(task.status() == TaskStatus::Todo);
    ensure!(task.error_message() == Some(ABANDONED_MESSAGE));
    Ok(())
}

#[rstest]
fn abandoning_planning_only_fails_a_generating_plan(clock: DefaultClock) -> eyre::Result<()> {
    let mut task = task_in(TaskStatus::Todo, &clock);
    task.abandon_planning(&clock);
    ensure!(task.plan_status() == Some(PlanStatus::Pending));

    task.begin_planning(AgentRunId::new(), &clock)?;
    task.abandon_planning(&clock);
    ensure!(task.plan_status() == Some(PlanStatus::Failed));
    Ok(())
}
