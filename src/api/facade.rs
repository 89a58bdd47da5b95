//! Object-safe view of the job service used by the HTTP handlers.

use crate::agent::ports::ExecutionAgent;
use crate::job::{
    domain::{FailureDisposition, Job, JobId, JobStatus, RunId, Task, TaskEvent, TaskId},
    ports::JobStore,
};
use crate::orchestration::{
    domain::{CompletionSignal, SignalDisposition},
    services::{JobService, JobServiceResult, SubmitJobRequest},
};
use crate::planner::ports::PlanGenerator;
use crate::source_control::ports::SourceControl;
use async_trait::async_trait;
use mockable::Clock;
use tracing::debug;

/// Job operations reachable over HTTP.
///
/// Starting or resuming a job detaches its orchestration loop; the loop
/// keeps running after the request completes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Plans and persists a new job.
    async fn submit(&self, request: SubmitJobRequest) -> JobServiceResult<Job>;

    /// Starts a `pending` job.
    async fn start(&self, job_id: JobId) -> JobServiceResult<Job>;

    /// Pauses a `running` job.
    async fn pause(&self, job_id: JobId) -> JobServiceResult<Job>;

    /// Resumes a `paused` job.
    async fn resume(&self, job_id: JobId) -> JobServiceResult<Job>;

    /// Marks a non-terminal job as failed.
    async fn fail(&self, job_id: JobId, message: String) -> JobServiceResult<Job>;

    /// Restarts the loops of `running` jobs and returns their ids.
    async fn recover_running(&self) -> JobServiceResult<Vec<JobId>>;

    /// Returns one job.
    async fn get_job(&self, job_id: JobId) -> JobServiceResult<Job>;

    /// Lists jobs newest first.
    async fn list_jobs(&self, status: Option<JobStatus>) -> JobServiceResult<Vec<Job>>;

    /// Lists a job's tasks oldest first.
    async fn list_tasks(&self, job_id: JobId) -> JobServiceResult<Vec<Task>>;

    /// Returns one task.
    async fn get_task(&self, task_id: TaskId) -> JobServiceResult<Task>;

    /// Lists a task's audit events oldest first.
    async fn list_events(&self, task_id: TaskId) -> JobServiceResult<Vec<TaskEvent>>;

    /// Applies an authoritative task outcome.
    async fn report_outcome(
        &self,
        signal: CompletionSignal,
    ) -> JobServiceResult<SignalDisposition>;

    /// Applies a retryable task failure.
    async fn report_attempt_failure(
        &self,
        task_id: TaskId,
        run_id: Option<RunId>,
        error: String,
    ) -> JobServiceResult<Option<FailureDisposition>>;
}

#[async_trait]
impl<S, G, A, V, C> JobApi for JobService<S, G, A, V, C>
where
    S: JobStore + 'static,
    G: PlanGenerator,
    A: ExecutionAgent + 'static,
    V: SourceControl,
    C: Clock + Send + Sync + 'static,
{
    async fn submit(&self, request: SubmitJobRequest) -> JobServiceResult<Job> {
        Self::submit(self, request).await
    }

    async fn start(&self, job_id: JobId) -> JobServiceResult<Job> {
        let (job, _loop_handle) = Self::start(self, job_id).await?.into_parts();
        debug!(%job_id, "orchestration loop detached");
        Ok(job)
    }

    async fn pause(&self, job_id: JobId) -> JobServiceResult<Job> {
        Self::pause(self, job_id).await
    }

    async fn resume(&self, job_id: JobId) -> JobServiceResult<Job> {
        let (job, _loop_handle) = Self::resume(self, job_id).await?.into_parts();
        debug!(%job_id, "orchestration loop detached");
        Ok(job)
    }

    async fn fail(&self, job_id: JobId, message: String) -> JobServiceResult<Job> {
        Self::fail(self, job_id, message).await
    }

    async fn recover_running(&self) -> JobServiceResult<Vec<JobId>> {
        let recovered = Self::recover_running(self).await?;
        Ok(recovered
            .into_iter()
            .map(|running| running.into_parts().0.id())
            .collect())
    }

    async fn get_job(&self, job_id: JobId) -> JobServiceResult<Job> {
        Self::get_job(self, job_id).await
    }

    async fn list_jobs(&self, status: Option<JobStatus>) -> JobServiceResult<Vec<Job>> {
        Self::list_jobs(self, status).await
    }

    async fn list_tasks(&self, job_id: JobId) -> JobServiceResult<Vec<Task>> {
        Self::list_tasks(self, job_id).await
    }

    async fn get_task(&self, task_id: TaskId) -> JobServiceResult<Task> {
        Self::get_task(self, task_id).await
    }

    async fn list_events(&self, task_id: TaskId) -> JobServiceResult<Vec<TaskEvent>> {
        Self::list_events(self, task_id).await
    }

    async fn report_outcome(
        &self,
        signal: CompletionSignal,
    ) -> JobServiceResult<SignalDisposition> {
        Self::report_outcome(self, &signal).await
    }

    async fn report_attempt_failure(
        &self,
        task_id: TaskId,
        run_id: Option<RunId>,
        error: String,
    ) -> JobServiceResult<Option<FailureDisposition>> {
        Self::report_attempt_failure(self, task_id, run_id.as_ref(), &error).await
    }
}
