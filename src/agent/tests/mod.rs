//! Unit tests for the agent module.
