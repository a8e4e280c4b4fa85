//! Agent runs dispatched to the external coding-agent service.
//!
//! A run is one unit of planning or implementation work. Runs move through
//! `creating`, `running`, and one terminal status; reports from the runner
//! are applied idempotently and never move a run backwards.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
