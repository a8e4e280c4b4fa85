//! Adapter implementations for agent run ports.

pub mod memory;
pub mod postgres;
