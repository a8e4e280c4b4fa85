//! Task aggregate root and its lifecycle transitions.

use super::{
    Assignee, ClosedPullRequestDisposition, CommentId, NoChangesPolicy, PlanStatus,
    TaskDomainError, TaskId, TaskStatus, TransitionRejection, WorkspaceId,
};
use crate::agent_run::domain::{ABANDONED_MESSAGE, AgentRunId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Agent-directed comment waiting for the active implementation run to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedInstruction {
    /// Comment the instruction came from.
    pub comment_id: CommentId,
    /// Comment body, used verbatim as run instructions.
    pub body: String,
}

/// Facts about the task's runs that guard manual status moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualMoveGuard {
    /// Whether any run of the task is still non-terminal.
    pub has_active_run: bool,
    /// Whether the current implementation run references a pull request.
    pub current_run_has_pull_request: bool,
}

/// Board position captured before a dispatch attempt, so a refused dispatch
/// can put the task back exactly where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    status: TaskStatus,
    completed_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Returns the captured status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }
}

/// Validated fields for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Workspace owning the task.
    pub workspace_id: WorkspaceId,
    /// Task title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Optional original prompt the task was written from.
    pub prompt: Option<String>,
    /// Initial board column.
    pub status: TaskStatus,
    /// Initial assignee.
    pub assignee: Option<Assignee>,
    /// Preferred agent flavour, when assigned to the agent.
    pub agent_type: Option<String>,
    /// Parent task for subtasks.
    pub parent_id: Option<TaskId>,
    /// Manual ranking within the column.
    pub order_index: i64,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    workspace_id: WorkspaceId,
    title: String,
    description: Option<String>,
    prompt: Option<String>,
    plan: Option<String>,
    plan_generated_at: Option<DateTime<Utc>>,
    plan_status: Option<PlanStatus>,
    status: TaskStatus,
    assignee: Option<Assignee>,
    agent_type: Option<String>,
    current_planning_run: Option<AgentRunId>,
    current_run: Option<AgentRunId>,
    parent_id: Option<TaskId>,
    order_index: i64,
    error_message: Option<String>,
    queued_instructions: Vec<QueuedInstruction>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: Option<String>,
    /// Original prompt.
    pub prompt: Option<String>,
    /// Generated plan text.
    pub plan: Option<String>,
    /// When the plan was stored.
    pub plan_generated_at: Option<DateTime<Utc>>,
    /// Plan progress.
    pub plan_status: Option<PlanStatus>,
    /// Board column.
    pub status: TaskStatus,
    /// Assignee.
    pub assignee: Option<Assignee>,
    /// Preferred agent flavour.
    pub agent_type: Option<String>,
    /// Current planning run pointer.
    pub current_planning_run: Option<AgentRunId>,
    /// Current implementation run pointer.
    pub current_run: Option<AgentRunId>,
    /// Parent task.
    pub parent_id: Option<TaskId>,
    /// Manual ranking.
    pub order_index: i64,
    /// User-visible failure message.
    pub error_message: Option<String>,
    /// Instructions waiting for the active run to end.
    pub queued_instructions: Vec<QueuedInstruction>,
    /// Optimistic concurrency revision.
    pub revision: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Archive timestamp.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new task.
    ///
    /// Tasks assigned to the agent start with a `pending` plan; others have
    /// no plan status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is blank.
    pub fn new(new_task: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let title = new_task.title.trim();
        if title.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        let plan_status =
            (new_task.assignee == Some(Assignee::Agent)).then_some(PlanStatus::Pending);
        let completed_at = new_task.status.is_terminal().then_some(timestamp);

        Ok(Self {
            id: TaskId::new(),
            workspace_id: new_task.workspace_id,
            title: title.to_owned(),
            description: new_task.description,
            prompt: new_task.prompt,
            plan: None,
            plan_generated_at: None,
            plan_status,
            status: new_task.status,
            assignee: new_task.assignee,
            agent_type: new_task.agent_type,
            current_planning_run: None,
            current_run: None,
            parent_id: new_task.parent_id,
            order_index: new_task.order_index,
            error_message: None,
            queued_instructions: Vec::new(),
            revision: 0,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at,
            archived_at: None,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            workspace_id: data.workspace_id,
            title: data.title,
            description: data.description,
            prompt: data.prompt,
            plan: data.plan,
            plan_generated_at: data.plan_generated_at,
            plan_status: data.plan_status,
            status: data.status,
            assignee: data.assignee,
            agent_type: data.agent_type,
            current_planning_run: data.current_planning_run,
            current_run: data.current_run,
            parent_id: data.parent_id,
            order_index: data.order_index,
            error_message: data.error_message,
            queued_instructions: data.queued_instructions,
            revision: data.revision,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
            archived_at: data.archived_at,
        }
    }

    /// Returns a copy carrying the next storage revision.
    ///
    /// Repositories call this when a compare-and-set update succeeds.
    #[must_use]
    pub fn with_next_revision(mut self) -> Self {
        self.revision = self.revision.saturating_add(1);
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning workspace.
    #[must_use]
    pub const fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the original prompt, if any.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Returns the generated plan, if any.
    #[must_use]
    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    /// Returns when the plan was stored.
    #[must_use]
    pub const fn plan_generated_at(&self) -> Option<DateTime<Utc>> {
        self.plan_generated_at
    }

    /// Returns the plan status, if the task tracks one.
    #[must_use]
    pub const fn plan_status(&self) -> Option<PlanStatus> {
        self.plan_status
    }

    /// Returns the board column.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<Assignee> {
        self.assignee
    }

    /// Returns `true` when the task is assigned to the agent.
    #[must_use]
    pub fn is_assigned_to_agent(&self) -> bool {
        self.assignee == Some(Assignee::Agent)
    }

    /// Returns the preferred agent flavour, if any.
    #[must_use]
    pub fn agent_type(&self) -> Option<&str> {
        self.agent_type.as_deref()
    }

    /// Returns the current planning run pointer.
    #[must_use]
    pub const fn current_planning_run(&self) -> Option<AgentRunId> {
        self.current_planning_run
    }

    /// Returns the current (latest) implementation run pointer.
    #[must_use]
    pub const fn current_run(&self) -> Option<AgentRunId> {
        self.current_run
    }

    /// Returns the parent task, if this is a subtask.
    #[must_use]
    pub const fn parent_id(&self) -> Option<TaskId> {
        self.parent_id
    }

    /// Returns the manual ranking.
    #[must_use]
    pub const fn order_index(&self) -> i64 {
        self.order_index
    }

    /// Returns the user-visible failure message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns instructions queued behind the active implementation run.
    #[must_use]
    pub fn queued_instructions(&self) -> &[QueuedInstruction] {
        &self.queued_instructions
    }

    /// Returns the optimistic concurrency revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the completion timestamp; set while the task is `done`.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the archive timestamp, if archived.
    #[must_use]
    pub const fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    /// Returns `true` once the task has been archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Fails with [`TaskDomainError::TaskArchived`] for archived tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskArchived`] when the task is archived.
    pub fn ensure_active(&self) -> Result<(), TaskDomainError> {
        if self.is_archived() {
            return Err(TaskDomainError::TaskArchived(self.id));
        }
        Ok(())
    }

    /// Fails unless the task is assigned to the agent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAssignedToAgent`] otherwise.
    pub fn ensure_agent_assigned(&self) -> Result<(), TaskDomainError> {
        if !self.is_assigned_to_agent() {
            return Err(TaskDomainError::NotAssignedToAgent(self.id));
        }
        Ok(())
    }

    /// Applies a manual board move.
    ///
    /// Every move is allowed except moving to `done` while a run is still
    /// active and moving to `in_review` without a pull request on the current
    /// run. Returns `false` when the task already has the target status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when a guard
    /// refuses the move, or [`TaskDomainError::TaskArchived`].
    pub fn move_to(
        &mut self,
        target: TaskStatus,
        guard: ManualMoveGuard,
        clock: &impl Clock,
    ) -> Result<bool, TaskDomainError> {
        self.ensure_active()?;
        if target == self.status {
            return Ok(false);
        }
        let rejection = match target {
            TaskStatus::Done if guard.has_active_run => Some(TransitionRejection::ActiveRun),
            TaskStatus::InReview if !guard.current_run_has_pull_request => {
                Some(TransitionRejection::MissingPullRequest)
            }
            _ => None,
        };
        if let Some(reason) = rejection {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: target,
                reason,
            });
        }
        self.set_status(target, clock);
        Ok(true)
    }

    /// Changes the assignee.
    ///
    /// Assigning the agent to a task without a plan status starts tracking
    /// one as `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskArchived`] for archived tasks.
    pub fn reassign(
        &mut self,
        assignee: Option<Assignee>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_active()?;
        self.assignee = assignee;
        if assignee == Some(Assignee::Agent) && self.plan_status.is_none() {
            self.plan_status = Some(PlanStatus::Pending);
        }
        self.touch(clock);
        Ok(())
    }

    /// Points the task at a new planning run and marks the plan as
    /// generating.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskArchived`] for archived tasks.
    pub fn begin_planning(
        &mut self,
        run_id: AgentRunId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_active()?;
        self.current_planning_run = Some(run_id);
        self.plan_status = Some(PlanStatus::Generating);
        self.error_message = None;
        self.touch(clock);
        Ok(())
    }

    /// Stores the plan produced by the current planning run.
    pub fn record_plan(&mut self, plan: impl Into<String>, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.plan = Some(plan.into());
        self.plan_generated_at = Some(timestamp);
        self.plan_status = Some(PlanStatus::Ready);
        self.error_message = None;
        self.updated_at = timestamp;
    }

    /// Records a failed planning run; the task status is unaffected.
    pub fn fail_planning(&mut self, message: impl Into<String>, clock: &impl Clock) {
        self.plan_status = Some(PlanStatus::Failed);
        self.error_message = Some(message.into());
        self.touch(clock);
    }

    /// Points the task at a new implementation run and moves it to
    /// `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskArchived`] or
    /// [`TaskDomainError::NotAssignedToAgent`].
    pub fn begin_implementation(
        &mut self,
        run_id: AgentRunId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.attach_follow_up_run(run_id, clock)?;
        self.set_status(TaskStatus::InProgress, clock);
        Ok(())
    }

    /// Points the task at a follow-up implementation run without changing
    /// its status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskArchived`] or
    /// [`TaskDomainError::NotAssignedToAgent`].
    pub fn attach_follow_up_run(
        &mut self,
        run_id: AgentRunId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_active()?;
        self.ensure_agent_assigned()?;
        self.current_run = Some(run_id);
        self.error_message = None;
        self.touch(clock);
        Ok(())
    }

    /// Captures the status and completion time ahead of a dispatch attempt.
    #[must_use]
    pub const fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            completed_at: self.completed_at,
        }
    }

    /// Restores the board position held before a dispatch attempt that
    /// failed. A task that was `done` keeps its original completion time.
    pub fn restore_after_failed_dispatch(
        &mut self,
        prior: StatusSnapshot,
        message: impl Into<String>,
        clock: &impl Clock,
    ) {
        self.error_message = Some(message.into());
        self.set_status(prior.status, clock);
        if prior.status.is_terminal() {
            self.completed_at = prior.completed_at;
        }
    }

    /// Moves the task to `in_review` after its run opened a pull request.
    pub fn enter_review(&mut self, clock: &impl Clock) {
        self.error_message = None;
        self.set_status(TaskStatus::InReview, clock);
    }

    /// Applies the configured policy for runs that finished without a pull
    /// request.
    pub fn finish_without_changes(&mut self, policy: NoChangesPolicy, clock: &impl Clock) {
        let target = match policy {
            NoChangesPolicy::RevertToTodo => TaskStatus::Todo,
            NoChangesPolicy::MarkDone => TaskStatus::Done,
        };
        self.set_status(target, clock);
    }

    /// Records a failed implementation run and returns the task to `todo`.
    pub fn fail_implementation(&mut self, message: impl Into<String>, clock: &impl Clock) {
        self.error_message = Some(message.into());
        self.set_status(TaskStatus::Todo, clock);
    }

    /// Marks the task `done` after its pull request merged.
    pub fn complete(&mut self, clock: &impl Clock) {
        self.set_status(TaskStatus::Done, clock);
    }

    /// Returns the task for rework after its pull request closed unmerged.
    pub fn reopen_for_rework(
        &mut self,
        disposition: ClosedPullRequestDisposition,
        clock: &impl Clock,
    ) {
        self.set_status(disposition.target_status(), clock);
    }

    /// Moves the task back to `in_review` after its pull request reopened.
    ///
    /// Returns `false` for completed tasks, which stay `done`.
    pub fn return_to_review(&mut self, clock: &impl Clock) -> bool {
        if self.status.is_terminal() || self.status == TaskStatus::InReview {
            return false;
        }
        self.set_status(TaskStatus::InReview, clock);
        true
    }

    /// Queues agent instructions behind the active implementation run.
    pub fn queue_instruction(&mut self, instruction: QueuedInstruction, clock: &impl Clock) {
        self.queued_instructions.push(instruction);
        self.touch(clock);
    }

    /// Removes and returns every queued instruction, oldest first.
    pub fn drain_instructions(&mut self, clock: &impl Clock) -> Vec<QueuedInstruction> {
        let drained = std::mem::take(&mut self.queued_instructions);
        if !drained.is_empty() {
            self.touch(clock);
        }
        drained
    }

    /// Undoes the effects of a planning run that was abandoned.
    pub fn abandon_planning(&mut self, clock: &impl Clock) {
        if self.plan_status == Some(PlanStatus::Generating) {
            self.fail_planning(ABANDONED_MESSAGE, clock);
        }
    }

    /// Undoes the effects of an implementation run that was abandoned.
    pub fn abandon_implementation(&mut self, clock: &impl Clock) {
        self.queued_instructions.clear();
        if self.status == TaskStatus::InProgress {
            self.fail_implementation(ABANDONED_MESSAGE, clock);
        } else {
            self.touch(clock);
        }
    }

    /// Archives the task. Returns `false` when it was already archived.
    pub fn archive(&mut self, clock: &impl Clock) -> bool {
        if self.is_archived() {
            return false;
        }
        let timestamp = clock.utc();
        self.archived_at = Some(timestamp);
        self.updated_at = timestamp;
        true
    }

    fn set_status(&mut self, target: TaskStatus, clock: &impl Clock) {
        let timestamp = clock.utc();
        if target.is_terminal() {
            if !self.status.is_terminal() {
                self.completed_at = Some(timestamp);
            }
        } else {
            self.completed_at = None;
        }
        self.status = target;
        self.updated_at = timestamp;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
