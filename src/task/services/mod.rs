//! Application services for task lifecycle orchestration.

mod error;
mod lifecycle;
mod locks;
mod outcomes;
mod requests;

pub use error::{TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::{LifecyclePorts, MISSING_PLAN_MESSAGE, TaskLifecycleService};
pub use outcomes::{
    CommentOutcome, NotTriggeredReason, PostedComment, ReconcileOutcome, StartedRun,
};
pub use requests::CreateTaskRequest;
