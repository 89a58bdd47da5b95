//! Unit tests for the job module.
//!
//! Covers the aggregate lifecycles, identifier validation and the in-memory
//! store contract.
