//! Unit tests for the agent run module.
