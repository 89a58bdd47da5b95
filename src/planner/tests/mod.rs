//! Unit tests for the planner module.
