//! Port contracts for job, task and event persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by the planner and
//! orchestration services.

pub mod store;

pub use store::{JobStore, StoreError, StoreResult};
