//! In-memory adapters for agent run persistence and dispatch.

mod repository;
mod runner;

pub use repository::InMemoryAgentRunRepository;
pub use runner::InMemoryAgentRunner;
