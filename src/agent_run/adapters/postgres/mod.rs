//! `PostgreSQL` adapters for agent run persistence.

mod models;
mod repository;
mod schema;

pub use repository::{AgentRunPgPool, PostgresAgentRunRepository};
