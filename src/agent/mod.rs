//! Execution agent integration.
//!
//! Dispatch hands each task to an [`ports::ExecutionAgent`] as a
//! [`domain::LaunchRequest`]. The agent acknowledges with a run reference
//! and later reports the outcome through the completion signal.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
