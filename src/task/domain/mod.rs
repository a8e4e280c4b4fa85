//! Domain model for the task lifecycle.
//!
//! Tasks move across the board (`backlog`, `todo`, `in_progress`,
//! `in_review`, `done`) either manually or as a consequence of agent run
//! outcomes. The aggregate owns the pointers to its current runs, the plan
//! text, and instructions queued for follow-up work. Infrastructure concerns
//! stay outside of this boundary.

mod comment;
mod error;
mod ids;
mod repository_link;
mod status;
mod task;

pub use comment::{AgentMention, Comment, CommentAuthor};
pub use error::{
    ParseAssigneeError, ParsePlanStatusError, ParseTaskStatusError, TaskDomainError,
    TransitionRejection,
};
pub use ids::{CommentId, RepositoryFullName, TaskId, UserId, WorkspaceId};
pub use repository_link::{BranchName, LinkedRepository, VcsProvider};
pub use status::{Assignee, ClosedPullRequestDisposition, NoChangesPolicy, PlanStatus, TaskStatus};
pub use task::{
    ManualMoveGuard, NewTask, PersistedTaskData, QueuedInstruction, StatusSnapshot, Task,
};
