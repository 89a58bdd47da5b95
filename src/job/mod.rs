//! Job, task and task-event records for Conductor.
//!
//! A job is one submitted goal; its tasks form a dependency DAG produced by
//! the planner, and task events are an append-only audit trail of every
//! transition. The module follows hexagonal architecture:
//!
//! - Domain types and lifecycle guards in [`domain`]
//! - The persistence port in [`ports`]
//! - In-memory and `PostgreSQL` store implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
