//! Source-control side effects of the job lifecycle.
//!
//! Submission creates a work branch and start opens a pull request. Both
//! are best-effort: failures are logged by the caller and only leave the
//! corresponding job field empty.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
