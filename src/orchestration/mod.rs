//! Job orchestration engine.
//!
//! Each tick of the [`services::Orchestrator`] loop runs two sequenced
//! phases over a job's tasks: the resolver promotes `pending` tasks whose
//! dependencies all succeeded, then the dispatcher launches `ready` tasks
//! up to the concurrency ceiling. Completion signals from the execution
//! agent are applied immediately through the
//! [`services::CompletionHandler`], independent of the tick cadence.
//!
//! [`services::JobService`] is the entry point for submitting, starting,
//! pausing and querying jobs.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
