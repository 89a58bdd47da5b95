//! Errors raised by the orchestration engine.

use crate::job::{
    domain::{JobDomainError, JobId, TaskId},
    ports::StoreError,
};
use thiserror::Error;

/// Errors returned by orchestration components.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    /// A domain transition was rejected.
    #[error(transparent)]
    Domain(#[from] JobDomainError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Another loop instance holds the run lease for the job.
    #[error("an orchestration loop is already running for job {0}")]
    AlreadyRunning(JobId),
}

/// Result type for orchestration operations.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
