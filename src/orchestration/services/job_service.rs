//! Job submission, lifecycle control and queries.

use super::{OrchestrationError, OrchestrationResult, Orchestrator};
use crate::agent::ports::ExecutionAgent;
use crate::job::{
    domain::{
        BranchName, FailureDisposition, Job, JobDomainError, JobId, JobStatus, RunId, Task,
        TaskDraft, TaskEvent, TaskEventKind, TaskId,
    },
    ports::{JobStore, StoreError},
};
use crate::orchestration::domain::{CompletionSignal, LoopExit, SignalDisposition};
use crate::planner::{
    domain::PlanRequest,
    ports::PlanGenerator,
    services::{PlannerService, PlanningError},
};
use crate::source_control::{
    domain::{PullRequestDraft, RepositoryRef},
    ports::SourceControl,
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Request payload for submitting a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitJobRequest {
    goal: String,
    repository: String,
    base_branch: Option<String>,
    repository_context: Option<String>,
}

impl SubmitJobRequest {
    /// Creates a request for `goal` against `repository` on `main`.
    #[must_use]
    pub fn new(goal: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            repository: repository.into(),
            base_branch: None,
            repository_context: None,
        }
    }

    /// Sets the base branch.
    #[must_use]
    pub fn with_base_branch(mut self, base_branch: impl Into<String>) -> Self {
        self.base_branch = Some(base_branch.into());
        self
    }

    /// Sets free-text repository context for the planner.
    #[must_use]
    pub fn with_repository_context(mut self, context: impl Into<String>) -> Self {
        self.repository_context = Some(context.into());
        self
    }
}

/// Service-level errors for job operations.
#[derive(Debug, Error)]
pub enum JobServiceError {
    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] JobDomainError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Planning failed; the job was marked failed.
    #[error("planning failed: {0}")]
    PlanningFailed(#[source] PlanningError),

    /// The orchestration engine failed.
    #[error(transparent)]
    Orchestration(OrchestrationError),

    /// The job does not exist.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The job is not in a status that permits the operation.
    #[error("cannot {operation} job {job_id} while it is {status}")]
    InvalidState {
        /// Job the operation targeted.
        job_id: JobId,
        /// Current job status.
        status: JobStatus,
        /// Operation that was rejected.
        operation: &'static str,
    },
}

impl From<OrchestrationError> for JobServiceError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::TaskNotFound(task_id) => Self::TaskNotFound(task_id),
            OrchestrationError::Store(store) => Self::Store(store),
            OrchestrationError::Domain(domain) => Self::Domain(domain),
            other @ OrchestrationError::AlreadyRunning(_) => Self::Orchestration(other),
        }
    }
}

/// Result type for job service operations.
pub type JobServiceResult<T> = Result<T, JobServiceError>;

/// A job whose orchestration loop was spawned.
#[derive(Debug)]
pub struct RunningJob {
    job: Job,
    handle: JoinHandle<OrchestrationResult<LoopExit>>,
}

impl RunningJob {
    /// Returns the job as it was when the loop was spawned.
    #[must_use]
    pub const fn job(&self) -> &Job {
        &self.job
    }

    /// Splits into the job and the loop's join handle.
    #[must_use]
    pub fn into_parts(self) -> (Job, JoinHandle<OrchestrationResult<LoopExit>>) {
        (self.job, self.handle)
    }
}

/// Entry point for submitting and controlling jobs.
pub struct JobService<S, G, A, V, C>
where
    S: JobStore,
    G: PlanGenerator,
    A: ExecutionAgent,
    V: SourceControl,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    planner: PlannerService<G>,
    source_control: Arc<V>,
    orchestrator: Arc<Orchestrator<S, A, C>>,
    clock: Arc<C>,
}

impl<S, G, A, V, C> JobService<S, G, A, V, C>
where
    S: JobStore + 'static,
    G: PlanGenerator,
    A: ExecutionAgent + 'static,
    V: SourceControl,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a job service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        planner: PlannerService<G>,
        source_control: Arc<V>,
        orchestrator: Arc<Orchestrator<S, A, C>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            planner,
            source_control,
            orchestrator,
            clock,
        }
    }

    /// Returns the shared orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<Orchestrator<S, A, C>> {
        &self.orchestrator
    }

    /// Validates and plans a goal, persisting the job and its tasks.
    ///
    /// The job is stored in `planning`, a work branch is created on a
    /// best-effort basis, and the job becomes `pending` once every task is
    /// persisted. On planning failure the job is marked `failed` and no
    /// task is stored.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::Domain`] for invalid input,
    /// [`JobServiceError::PlanningFailed`] when planning fails, or a store
    /// error.
    pub async fn submit(&self, request: SubmitJobRequest) -> JobServiceResult<Job> {
        let base_branch = match request.base_branch {
            Some(name) => BranchName::new(name)?,
            None => BranchName::main(),
        };
        let mut job = Job::new(request.goal, request.repository, base_branch, &*self.clock)?;
        self.store.insert_job(&job).await?;
        info!(job_id = %job.id(), repository = job.repository(), "job submitted");

        self.create_work_branch(&mut job).await;

        let mut plan_request =
            PlanRequest::new(job.goal(), job.repository(), job.base_branch().clone());
        if let Some(context) = request.repository_context {
            plan_request = plan_request.with_repository_context(context);
        }
        let max_attempts = self.orchestrator.policy().default_max_attempts();
        let planned = self
            .planner
            .plan(&plan_request, max_attempts)
            .await
            .and_then(|drafts| {
                build_tasks(job.id(), drafts, &*self.clock)
                    .map_err(|err| PlanningError::InvalidPlan(err.to_string()))
            });
        let tasks = match planned {
            Ok(tasks) => tasks,
            Err(err) => return Err(self.abandon(job, err).await),
        };

        self.store.insert_tasks(&tasks).await?;
        for task in &tasks {
            let metadata = json!({
                "title": task.title(),
                "role": task.role(),
                "dependencies": task.dependencies(),
            });
            self.store
                .append_event(&TaskEvent::new(
                    task.id(),
                    TaskEventKind::Created,
                    metadata,
                    &*self.clock,
                ))
                .await?;
        }

        job.transition_to(JobStatus::Pending, &*self.clock)?;
        self.store.update_job(&job).await?;
        info!(job_id = %job.id(), tasks = tasks.len(), "job planned");
        Ok(job)
    }

    async fn create_work_branch(&self, job: &mut Job) {
        let repository = match RepositoryRef::parse(job.repository()) {
            Ok(repository) => repository,
            Err(err) => {
                warn!(job_id = %job.id(), error = %err, "skipping work branch");
                return;
            }
        };
        let branch = BranchName::for_job(job.id());
        match self
            .source_control
            .create_branch(&repository, job.base_branch(), &branch)
            .await
        {
            Ok(()) => {
                info!(job_id = %job.id(), %branch, "work branch created");
                job.record_branch(branch, &*self.clock);
            }
            Err(err) => warn!(job_id = %job.id(), error = %err, "failed to create work branch"),
        }
    }

    async fn abandon(&self, mut job: Job, err: PlanningError) -> JobServiceError {
        error!(job_id = %job.id(), error = %err, "planning failed");
        let persisted = match job.fail(err.to_string(), &*self.clock) {
            Ok(()) => self.store.update_job(&job).await.map_err(JobServiceError::from),
            Err(domain) => Err(domain.into()),
        };
        if let Err(persist_err) = persisted {
            warn!(job_id = %job.id(), error = %persist_err, "failed to mark job as failed");
        }
        JobServiceError::PlanningFailed(err)
    }

    /// Starts orchestration of a `pending` job.
    ///
    /// Opens a pull request on a best-effort basis when the job has a work
    /// branch and none was opened yet.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::JobNotFound`] for an unknown job,
    /// [`JobServiceError::InvalidState`] unless the job is `pending`, or a
    /// store error.
    pub async fn start(&self, job_id: JobId) -> JobServiceResult<RunningJob> {
        let mut job = self.load_job(job_id).await?;
        if job.status() != JobStatus::Pending {
            return Err(JobServiceError::InvalidState {
                job_id,
                status: job.status(),
                operation: "start",
            });
        }

        self.open_pull_request(&mut job).await;
        job.transition_to(JobStatus::Running, &*self.clock)?;
        self.commit_transition(&job, JobStatus::Pending, "start").await?;
        info!(%job_id, "job started");
        Ok(self.spawn_loop(job))
    }

    async fn open_pull_request(&self, job: &mut Job) {
        let Some(head) = job.branch().cloned() else {
            return;
        };
        if job.pull_request_url().is_some() {
            return;
        }
        let repository = match RepositoryRef::parse(job.repository()) {
            Ok(repository) => repository,
            Err(err) => {
                warn!(job_id = %job.id(), error = %err, "skipping pull request");
                return;
            }
        };
        let draft = PullRequestDraft::for_job(job, head);
        match self
            .source_control
            .create_pull_request(&repository, &draft)
            .await
        {
            Ok(url) => {
                info!(job_id = %job.id(), url = url.as_str(), "pull request opened");
                job.record_pull_request(url, &*self.clock);
            }
            Err(err) => warn!(job_id = %job.id(), error = %err, "failed to open pull request"),
        }
    }

    /// Writes a status change unless another writer moved the job first.
    async fn commit_transition(
        &self,
        job: &Job,
        expected: JobStatus,
        operation: &'static str,
    ) -> JobServiceResult<()> {
        if self.store.update_job_if_status(job, expected).await? {
            return Ok(());
        }
        let current = self.load_job(job.id()).await?;
        Err(JobServiceError::InvalidState {
            job_id: job.id(),
            status: current.status(),
            operation,
        })
    }

    /// Restarts the loop of every `running` job.
    ///
    /// Called at startup so that jobs whose loop died with the previous
    /// process keep advancing. Each loop waits until any lease left behind
    /// expires.
    ///
    /// # Errors
    ///
    /// Returns a store error when the jobs cannot be listed.
    pub async fn recover_running(&self) -> JobServiceResult<Vec<RunningJob>> {
        let jobs = self.store.list_jobs(Some(JobStatus::Running)).await?;
        if !jobs.is_empty() {
            info!(jobs = jobs.len(), "recovering orchestration loops");
        }
        Ok(jobs.into_iter().map(|job| self.spawn_loop(job)).collect())
    }

    fn spawn_loop(&self, job: Job) -> RunningJob {
        let orchestrator = Arc::clone(&self.orchestrator);
        let job_id = job.id();
        let handle = tokio::spawn(async move {
            let result = orchestrator.adopt(job_id).await;
            if let Err(err) = &result {
                warn!(%job_id, error = %err, "orchestration loop did not start");
            }
            result
        });
        RunningJob { job, handle }
    }

    /// Suspends a `running` job.
    ///
    /// The loop stops at its next tick. Work already handed to the agent is
    /// not cancelled; a `paused` event is appended to every unfinished task.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::JobNotFound`] for an unknown job,
    /// [`JobServiceError::InvalidState`] unless the job is `running` or when
    /// another writer changed its status first, or a store error.
    pub async fn pause(&self, job_id: JobId) -> JobServiceResult<Job> {
        let mut job = self.load_job(job_id).await?;
        if job.status() != JobStatus::Running {
            return Err(JobServiceError::InvalidState {
                job_id,
                status: job.status(),
                operation: "pause",
            });
        }
        job.transition_to(JobStatus::Paused, &*self.clock)?;
        self.commit_transition(&job, JobStatus::Running, "pause").await?;

        let tasks = self.store.tasks_for_job(job_id).await?;
        for task in tasks.iter().filter(|task| !task.status().is_terminal()) {
            let metadata = json!({ "status": task.status() });
            self.store
                .append_event(&TaskEvent::new(
                    task.id(),
                    TaskEventKind::Paused,
                    metadata,
                    &*self.clock,
                ))
                .await?;
        }
        info!(%job_id, "job paused");
        Ok(job)
    }

    /// Resumes a `paused` job and restarts its loop.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::JobNotFound`] for an unknown job,
    /// [`JobServiceError::InvalidState`] unless the job is `paused` or when
    /// another writer changed its status first, or a store error.
    pub async fn resume(&self, job_id: JobId) -> JobServiceResult<RunningJob> {
        let mut job = self.load_job(job_id).await?;
        if job.status() != JobStatus::Paused {
            return Err(JobServiceError::InvalidState {
                job_id,
                status: job.status(),
                operation: "resume",
            });
        }
        job.transition_to(JobStatus::Running, &*self.clock)?;
        self.commit_transition(&job, JobStatus::Paused, "resume").await?;
        info!(%job_id, "job resumed");
        Ok(self.spawn_loop(job))
    }

    /// Fails a job on operator request.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::JobNotFound`] for an unknown job,
    /// [`JobServiceError::InvalidState`] when the job is already terminal,
    /// or a store error.
    pub async fn fail(&self, job_id: JobId, message: impl Into<String>) -> JobServiceResult<Job> {
        let mut job = self.load_job(job_id).await?;
        if job.status().is_terminal() {
            return Err(JobServiceError::InvalidState {
                job_id,
                status: job.status(),
                operation: "fail",
            });
        }
        let previous = job.status();
        job.fail(message, &*self.clock)?;
        self.commit_transition(&job, previous, "fail").await?;
        warn!(%job_id, "job failed by operator");
        Ok(job)
    }

    /// Applies an authoritative outcome reported by the execution agent.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::TaskNotFound`] for an unknown task or a
    /// store error.
    pub async fn report_outcome(
        &self,
        signal: &CompletionSignal,
    ) -> JobServiceResult<SignalDisposition> {
        Ok(self.orchestrator.handle_signal(signal).await?)
    }

    /// Records a retryable failure reported by the execution agent.
    ///
    /// Consumes an attempt; see [`Orchestrator::handle_failure`].
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::TaskNotFound`] for an unknown task or a
    /// store error.
    pub async fn report_attempt_failure(
        &self,
        task_id: TaskId,
        run_id: Option<&RunId>,
        error: &str,
    ) -> JobServiceResult<Option<FailureDisposition>> {
        Ok(self
            .orchestrator
            .handle_failure(task_id, run_id, error)
            .await?)
    }

    /// Returns a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::JobNotFound`] for an unknown job or a
    /// store error.
    pub async fn get_job(&self, job_id: JobId) -> JobServiceResult<Job> {
        self.load_job(job_id).await
    }

    /// Lists jobs newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> JobServiceResult<Vec<Job>> {
        Ok(self.store.list_jobs(status).await?)
    }

    /// Lists the tasks of a job in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::JobNotFound`] for an unknown job or a
    /// store error.
    pub async fn list_tasks(&self, job_id: JobId) -> JobServiceResult<Vec<Task>> {
        self.load_job(job_id).await?;
        Ok(self.store.tasks_for_job(job_id).await?)
    }

    /// Returns a task.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::TaskNotFound`] for an unknown task or a
    /// store error.
    pub async fn get_task(&self, task_id: TaskId) -> JobServiceResult<Task> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or(JobServiceError::TaskNotFound(task_id))
    }

    /// Lists the audit events of a task in append order.
    ///
    /// # Errors
    ///
    /// Returns [`JobServiceError::TaskNotFound`] for an unknown task or a
    /// store error.
    pub async fn list_events(&self, task_id: TaskId) -> JobServiceResult<Vec<TaskEvent>> {
        self.get_task(task_id).await?;
        Ok(self.store.events_for_task(task_id).await?)
    }

    async fn load_job(&self, job_id: JobId) -> JobServiceResult<Job> {
        self.store
            .find_job(job_id)
            .await?
            .ok_or(JobServiceError::JobNotFound(job_id))
    }
}

fn build_tasks(
    job_id: JobId,
    drafts: Vec<TaskDraft>,
    clock: &impl Clock,
) -> Result<Vec<Task>, JobDomainError> {
    drafts
        .into_iter()
        .zip(0_u32..)
        .map(|(draft, position)| Task::new(job_id, position, draft, clock))
        .collect()
}
