//! Adapter implementations for context ports.

pub mod memory;
