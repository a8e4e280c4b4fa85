//! Step definitions for task agent lifecycle scenarios.

pub mod world;

mod given;
mod then;
mod when;
