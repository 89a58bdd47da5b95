//! Error types for job and task domain validation and parsing.

use super::{JobId, JobStatus, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobDomainError {
    /// The goal text is empty after trimming.
    #[error("job goal must not be empty")]
    EmptyGoal,

    /// The repository reference is empty or contains whitespace.
    #[error("invalid repository reference '{0}'")]
    InvalidRepository(String),

    /// The branch name is empty, contains a colon, or is too long.
    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTaskTitle,

    /// A task must allow at least one attempt.
    #[error("max attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(u32),

    /// The external run identifier is empty.
    #[error("run identifier must not be empty")]
    EmptyRunId,

    /// The job lifecycle does not permit the requested transition.
    #[error("job {job_id} cannot transition from {from} to {to}")]
    InvalidJobTransition {
        /// Job being transitioned.
        job_id: JobId,
        /// Current status.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },

    /// The task lifecycle does not permit the requested transition.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidTaskTransition {
        /// Task being transitioned.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
}

/// Error returned while parsing job statuses from persistence or input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task role: {0}")]
pub struct ParseTaskRoleError(pub String);

/// Error returned while parsing task event kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task event kind: {0}")]
pub struct ParseTaskEventKindError(pub String);
