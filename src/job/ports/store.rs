//! Store port for jobs, tasks, task events and run leases.

use crate::job::domain::{Job, JobId, JobStatus, LeaseHolder, Task, TaskEvent, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for the orchestration engine.
///
/// Every mutation is a point update keyed by identifier. The store performs
/// no orchestration logic of its own.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores a new job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateJob`] when the job ID already exists.
    async fn insert_job(&self, job: &Job) -> StoreResult<()>;

    /// Persists changes to an existing job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::JobNotFound`] when the job does not exist.
    async fn update_job(&self, job: &Job) -> StoreResult<()>;

    /// Persists `job` only while the stored job is still in `expected`.
    ///
    /// Returns `false` without writing when another writer moved the job
    /// to a different status first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::JobNotFound`] when the job does not exist.
    async fn update_job_if_status(&self, job: &Job, expected: JobStatus) -> StoreResult<bool>;

    /// Finds a job by identifier.
    async fn find_job(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// Lists jobs newest first, optionally restricted to one status.
    async fn list_jobs(&self, status: Option<JobStatus>) -> StoreResult<Vec<Job>>;

    /// Stores a batch of new tasks atomically: either every task is stored
    /// or none is.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::JobNotFound`] when an owning job does not exist
    /// or [`StoreError::DuplicateTask`] when a task ID already exists.
    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the task does not exist.
    async fn update_task(&self, task: &Task) -> StoreResult<()>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Returns the tasks of a job in creation order.
    async fn tasks_for_job(&self, job_id: JobId) -> StoreResult<Vec<Task>>;

    /// Appends an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the task does not exist.
    async fn append_event(&self, event: &TaskEvent) -> StoreResult<()>;

    /// Returns the events of a task in append order.
    async fn events_for_task(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>>;

    /// Claims or renews the run lease of a job for `holder`, stamping it
    /// with `now`.
    ///
    /// A lease last renewed before `stale_before` is taken over from its
    /// previous holder. Returns `false` when another holder owns a live
    /// lease.
    async fn acquire_run_lease(
        &self,
        job_id: JobId,
        holder: LeaseHolder,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Releases the run lease of a job if `holder` owns it.
    async fn release_run_lease(&self, job_id: JobId, holder: LeaseHolder) -> StoreResult<()>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A job with the same identifier already exists.
    #[error("duplicate job identifier: {0}")]
    DuplicateJob(JobId),

    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The job was not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a data-quality or deserialization error from persisted rows.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
