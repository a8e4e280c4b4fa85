//! Task lifecycle management.
//!
//! Tasks sit on a workspace board and may be assigned to the coding agent.
//! The lifecycle service requests planning and implementation runs, turns
//! run outcomes and pull request events into board moves, and routes agent
//! mentions in comments to follow-up runs. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
