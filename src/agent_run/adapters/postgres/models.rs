//! Diesel row models for agent run persistence.

use super::schema::agent_runs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for agent run records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = agent_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AgentRunRow {
    /// Internal run identifier.
    pub id: uuid::Uuid,
    /// Owning task identifier.
    pub task_id: uuid::Uuid,
    /// Run type.
    pub run_type: String,
    /// External runner identifier.
    pub external_run_id: Option<String>,
    /// Run status.
    pub status: String,
    /// Abandonment flag.
    pub abandoned: bool,
    /// Follow-up instructions.
    pub instructions: Option<String>,
    /// Pull request URL.
    pub pr_url: Option<String>,
    /// Pull request number.
    pub pr_number: Option<i64>,
    /// Pull request status.
    pub pr_status: Option<String>,
    /// Runner summary.
    pub summary: Option<String>,
    /// Failure message.
    pub error_message: Option<String>,
    /// Last applied sequence number.
    pub last_sequence: Option<i64>,
    /// Last applied report digest.
    pub last_report_digest: Option<String>,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Insert model for agent run records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = agent_runs)]
pub struct NewAgentRunRow {
    /// Internal run identifier.
    pub id: uuid::Uuid,
    /// Owning task identifier.
    pub task_id: uuid::Uuid,
    /// Run type.
    pub run_type: String,
    /// External runner identifier.
    pub external_run_id: Option<String>,
    /// Run status.
    pub status: String,
    /// Abandonment flag.
    pub abandoned: bool,
    /// Follow-up instructions.
    pub instructions: Option<String>,
    /// Pull request URL.
    pub pr_url: Option<String>,
    /// Pull request number.
    pub pr_number: Option<i64>,
    /// Pull request status.
    pub pr_status: Option<String>,
    /// Runner summary.
    pub summary: Option<String>,
    /// Failure message.
    pub error_message: Option<String>,
    /// Last applied sequence number.
    pub last_sequence: Option<i64>,
    /// Last applied report digest.
    pub last_report_digest: Option<String>,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub finished_at: Option<DateTime<Utc>>,
}
