//! Unit tests for the source-control module.
