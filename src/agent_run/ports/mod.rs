//! Port contracts for agent run persistence and dispatch.

pub mod repository;
pub mod runner;

pub use repository::{AgentRunRepository, AgentRunRepositoryError, AgentRunRepositoryResult};
pub use runner::{AgentRunner, AgentRunnerError, AgentRunnerResult, RunDispatch};
