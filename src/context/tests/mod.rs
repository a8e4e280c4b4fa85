//! Unit tests for the context module.
