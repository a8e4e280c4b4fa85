//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Owning workspace.
    pub workspace_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional original prompt.
    pub prompt: Option<String>,
    /// Generated plan text.
    pub plan: Option<String>,
    /// When the plan was stored.
    pub plan_generated_at: Option<DateTime<Utc>>,
    /// Plan progress.
    pub plan_status: Option<String>,
    /// Board column.
    pub status: String,
    /// Assignee kind.
    pub assignee: Option<String>,
    /// Preferred agent flavour.
    pub agent_type: Option<String>,
    /// Current planning run pointer.
    pub current_planning_run_id: Option<uuid::Uuid>,
    /// Current implementation run pointer.
    pub current_run_id: Option<uuid::Uuid>,
    /// Parent task.
    pub parent_id: Option<uuid::Uuid>,
    /// Manual ranking.
    pub order_index: i64,
    /// User-visible failure message.
    pub error_message: Option<String>,
    /// Queued instruction JSON array.
    pub queued_instructions: Value,
    /// Optimistic concurrency revision.
    pub revision: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Archive timestamp.
    pub archived_at: Option<DateTime<Utc>>,
}

/// Insert and changeset model for task records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct NewTaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Owning workspace.
    pub workspace_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional original prompt.
    pub prompt: Option<String>,
    /// Generated plan text.
    pub plan: Option<String>,
    /// When the plan was stored.
    pub plan_generated_at: Option<DateTime<Utc>>,
    /// Plan progress.
    pub plan_status: Option<String>,
    /// Board column.
    pub status: String,
    /// Assignee kind.
    pub assignee: Option<String>,
    /// Preferred agent flavour.
    pub agent_type: Option<String>,
    /// Current planning run pointer.
    pub current_planning_run_id: Option<uuid::Uuid>,
    /// Current implementation run pointer.
    pub current_run_id: Option<uuid::Uuid>,
    /// Parent task.
    pub parent_id: Option<uuid::Uuid>,
    /// Manual ranking.
    pub order_index: i64,
    /// User-visible failure message.
    pub error_message: Option<String>,
    /// Queued instruction JSON array.
    pub queued_instructions: Value,
    /// Optimistic concurrency revision.
    pub revision: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Archive timestamp.
    pub archived_at: Option<DateTime<Utc>>,
}
