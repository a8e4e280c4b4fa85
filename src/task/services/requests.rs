//! Request payloads for task lifecycle operations.

use crate::task::domain::{Assignee, TaskId, TaskStatus, WorkspaceId};

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub(super) workspace_id: WorkspaceId,
    pub(super) title: String,
    pub(super) description: Option<String>,
    pub(super) prompt: Option<String>,
    pub(super) status: Option<TaskStatus>,
    pub(super) assignee: Option<Assignee>,
    pub(super) agent_type: Option<String>,
    pub(super) parent_id: Option<TaskId>,
    pub(super) order_index: i64,
}

impl CreateTaskRequest {
    /// Creates a request with required task fields.
    #[must_use]
    pub fn new(workspace_id: WorkspaceId, title: impl Into<String>) -> Self {
        Self {
            workspace_id,
            title: title.into(),
            description: None,
            prompt: None,
            status: None,
            assignee: None,
            agent_type: None,
            parent_id: None,
            order_index: 0,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the original prompt the task was written from.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets the initial status; defaults to `todo`.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Sets the preferred agent flavour.
    #[must_use]
    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }

    /// Makes the task a subtask of `parent_id`.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the manual ranking.
    #[must_use]
    pub const fn with_order_index(mut self, order_index: i64) -> Self {
        self.order_index = order_index;
        self
    }
}
