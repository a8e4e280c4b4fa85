//! Tasklane: task lifecycle management for an external coding agent.
//!
//! This crate tracks tasks on a workspace board, dispatches planning and
//! implementation runs to an external coding-agent service, and reconciles
//! the reports and pull request events that come back.
//!
//! # Architecture
//!
//! Tasklane follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, in-memory)
//!
//! # Modules
//!
//! - [`task`]: Task records, comments, and the lifecycle service
//! - [`agent_run`]: Agent runs, status reports, and the runner port
//! - [`context`]: Context references, ranking, and prompt rendering
//! - [`config`]: Lifecycle policy configuration
//! - [`telemetry`]: Tracing subscriber setup

pub mod agent_run;
pub mod config;
pub mod context;
pub mod task;
pub mod telemetry;
