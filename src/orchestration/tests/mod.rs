//! Unit tests for the orchestration module.

mod support;
