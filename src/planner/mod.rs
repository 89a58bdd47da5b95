//! Goal decomposition into a dependency graph of tasks.
//!
//! A [`ports::PlanGenerator`] turns a goal into phases of plan-local task
//! descriptors. [`services::PlannerService`] validates that output and
//! remaps plan-local identifiers to globally unique task identifiers,
//! dropping any reference that would not form a forward edge.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
