//! Port for the external coding-agent service.

use crate::agent_run::domain::{AgentRunId, ExternalRunId, RunStatusReport, RunType};
use crate::context::domain::ContextItem;
use crate::task::domain::{LinkedRepository, TaskId};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for agent runner calls.
pub type AgentRunnerResult<T> = Result<T, AgentRunnerError>;

/// Work order handed to the external runner.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDispatch {
    /// Internal run identifier.
    pub run_id: AgentRunId,
    /// Task the run works on.
    pub task_id: TaskId,
    /// Planning or implementation.
    pub run_type: RunType,
    /// Rendered agent prompt.
    pub prompt: String,
    /// Ranked context attached to the prompt.
    pub context: Vec<ContextItem>,
    /// Repository to work against; always set for implementation runs.
    pub repository: Option<LinkedRepository>,
    /// Incremental instructions for follow-up runs.
    pub instructions: Option<String>,
}

/// External coding-agent service.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Starts a run and returns the runner's identifier for it.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunnerError`] when the runner cannot accept the run.
    async fn create_run(&self, dispatch: &RunDispatch) -> AgentRunnerResult<ExternalRunId>;

    /// Queries the current status of a run.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunnerError`] when the runner cannot be reached or
    /// does not know the run.
    async fn run_status(&self, external_run_id: &ExternalRunId)
    -> AgentRunnerResult<RunStatusReport>;
}

/// Errors reported by agent runner implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentRunnerError {
    /// The runner could not be reached or failed transiently.
    #[error("agent runner unavailable: {0}")]
    Unavailable(String),

    /// The runner refused the request.
    #[error("agent runner rejected the request: {0}")]
    Rejected(String),

    /// The runner does not know the run.
    #[error("agent runner does not know run {0}")]
    UnknownRun(ExternalRunId),
}
