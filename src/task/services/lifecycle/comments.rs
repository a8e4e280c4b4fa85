//! Comments and agent-mention follow-ups.

use super::{
    TaskLifecycleService,
    runs::{ImplementationStart, PendingDispatch},
};
use crate::agent_run::{
    domain::{PullRequest, PullRequestStatus, RunType},
    ports::AgentRunRepository,
};
use crate::task::{
    domain::{Comment, CommentAuthor, QueuedInstruction, Task, TaskId, TaskStatus},
    ports::{CommentRepository, TaskRepository},
    services::{
        CommentOutcome, NotTriggeredReason, PostedComment, TaskLifecycleError, TaskLifecycleResult,
    },
};
use mockable::Clock;
use tracing::{debug, info, warn};

/// What a recorded comment leaves to do once the task lock is released.
enum FollowUp {
    Settled(CommentOutcome),
    Dispatch(PendingDispatch),
}

impl<T, R, M, C> TaskLifecycleService<T, R, M, C>
where
    T: TaskRepository,
    R: AgentRunRepository,
    M: CommentRepository,
    C: Clock + Send + Sync,
{
    /// Appends a comment to the task.
    ///
    /// A user comment that mentions the agent while the task is
    /// `in_progress` or `in_review` asks for follow-up work: the body is
    /// queued when an implementation run is active, otherwise a follow-up
    /// run starts immediately with the body as instructions. A task in
    /// review whose pull request is still open keeps its status and pull
    /// request until that run reconciles; any other task starts a fresh
    /// implementation run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is missing or archived,
    /// the body is empty, or persistence fails. A refused follow-up dispatch
    /// is reported as [`CommentOutcome::DispatchFailed`].
    pub async fn add_comment(
        &self,
        task_id: TaskId,
        author: CommentAuthor,
        body: impl Into<String>,
    ) -> TaskLifecycleResult<PostedComment> {
        let (comment, follow_up) = self.record_comment(task_id, author, body).await?;
        let pending = match follow_up {
            FollowUp::Settled(outcome) => return Ok(PostedComment { comment, outcome }),
            FollowUp::Dispatch(pending) => pending,
        };
        let outcome = match self.dispatch(pending).await {
            Ok(started) => {
                info!(%task_id, run_id = %started.run.id(), "follow-up run started from comment");
                CommentOutcome::RunStarted(started.run)
            }
            Err(TaskLifecycleError::RunnerUnavailable { run_id, source }) => {
                warn!(%task_id, %run_id, error = %source, "follow-up dispatch failed");
                CommentOutcome::DispatchFailed {
                    run_id,
                    error: source,
                }
            }
            Err(err) => return Err(err),
        };
        Ok(PostedComment { comment, outcome })
    }

    async fn record_comment(
        &self,
        task_id: TaskId,
        author: CommentAuthor,
        body: impl Into<String>,
    ) -> TaskLifecycleResult<(Comment, FollowUp)> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self.load_task(task_id).await?;
        task.ensure_active()?;
        let comment = Comment::new(task_id, author, body, &self.mention, &*self.clock)?;
        self.comments.append(&comment).await?;
        debug!(
            %task_id,
            comment_id = %comment.id(),
            mentions_agent = comment.mentions_agent(),
            "comment recorded"
        );

        if !comment.requests_agent_work() {
            return Ok((comment, FollowUp::Settled(CommentOutcome::Recorded)));
        }
        let not_triggered = |reason| {
            debug!(%task_id, ?reason, "agent mention did not start work");
            FollowUp::Settled(CommentOutcome::NotTriggered(reason))
        };
        if !task.status().accepts_follow_up() {
            let skipped = not_triggered(NotTriggeredReason::StatusNotEligible(task.status()));
            return Ok((comment, skipped));
        }
        if !task.is_assigned_to_agent() {
            return Ok((comment, not_triggered(NotTriggeredReason::NotAssignedToAgent)));
        }

        if self
            .runs
            .find_active(task_id, RunType::Implementation)
            .await?
            .is_some()
        {
            task.queue_instruction(
                QueuedInstruction {
                    comment_id: comment.id(),
                    body: comment.body().to_owned(),
                },
                &*self.clock,
            );
            self.tasks.update(&task).await?;
            info!(
                %task_id,
                comment_id = %comment.id(),
                "agent instructions queued behind active run"
            );
            return Ok((comment, FollowUp::Settled(CommentOutcome::Queued)));
        }

        let Some(repository) = self.repository_links.resolve(task.workspace_id()).await? else {
            return Ok((comment, not_triggered(NotTriggeredReason::MissingRepository)));
        };
        let start = self.follow_up_start(&task).await?;
        let pending = self
            .prepare_implementation(task, repository, Some(comment.body().to_owned()), start)
            .await?;
        Ok((comment, FollowUp::Dispatch(pending)))
    }

    /// Picks how a follow-up run starts: a task in review whose pull request
    /// is still open keeps that pull request, anything else starts fresh.
    pub(super) async fn follow_up_start(
        &self,
        task: &Task,
    ) -> TaskLifecycleResult<ImplementationStart> {
        if task.status() != TaskStatus::InReview {
            return Ok(ImplementationStart::Fresh);
        }
        let has_open_pull_request = self
            .current_implementation_run(task)
            .await?
            .and_then(|run| run.pull_request().map(PullRequest::status))
            .is_some_and(|status| status == PullRequestStatus::Open);
        Ok(if has_open_pull_request {
            ImplementationStart::FollowUp
        } else {
            ImplementationStart::Fresh
        })
    }
}
