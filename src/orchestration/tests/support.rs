//! Shared fixtures for orchestration tests.

use crate::job::{
    adapters::memory::InMemoryJobStore,
    domain::{
        BranchName, Job, JobId, JobStatus, LeaseHolder, Task, TaskDraft, TaskEvent, TaskId,
        TaskRole, TaskStatus,
    },
    ports::{JobStore, StoreError, StoreResult},
};
use crate::orchestration::domain::OrchestrationPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::DefaultClock;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Policy with no delays so tests never sleep.
pub fn instant_policy() -> OrchestrationPolicy {
    OrchestrationPolicy::default()
        .with_poll_interval(Duration::ZERO)
        .with_retry_delay(Duration::ZERO)
}

/// Draft with the given dependencies.
pub fn draft(title: &str, role: TaskRole, dependencies: Vec<TaskId>, max_attempts: u32) -> TaskDraft {
    TaskDraft {
        id: TaskId::new(),
        title: title.to_owned(),
        objective: format!("Complete {title}"),
        role,
        dependencies,
        files: Vec::new(),
        definition_of_done: None,
        max_attempts,
    }
}

/// Stores a job in `running` with tasks built from `drafts`.
pub async fn seed_running_job(store: &InMemoryJobStore, drafts: Vec<TaskDraft>) -> (Job, Vec<Task>) {
    let clock = DefaultClock;
    let mut job = Job::new("Ship feature", "acme/web", BranchName::main(), &clock)
        .expect("valid job");
    job.transition_to(JobStatus::Pending, &clock)
        .expect("planning to pending");
    job.transition_to(JobStatus::Running, &clock)
        .expect("pending to running");
    store.insert_job(&job).await.expect("insert job");

    let tasks: Vec<Task> = drafts
        .into_iter()
        .zip(0_u32..)
        .map(|(item, position)| Task::new(job.id(), position, item, &clock).expect("valid task"))
        .collect();
    store.insert_tasks(&tasks).await.expect("insert tasks");
    (job, tasks)
}

/// Moves a stored task through the given statuses.
pub async fn force_status(store: &InMemoryJobStore, task_id: TaskId, path: &[TaskStatus]) -> Task {
    let mut task = store
        .find_task(task_id)
        .await
        .expect("lookup")
        .expect("task exists");
    for status in path {
        task.transition_to(*status, &DefaultClock)
            .expect("valid transition");
    }
    store.update_task(&task).await.expect("update task");
    task
}

/// Reads the current status of a task.
pub async fn status_of(store: &InMemoryJobStore, task_id: TaskId) -> TaskStatus {
    store
        .find_task(task_id)
        .await
        .expect("lookup")
        .expect("task exists")
        .status()
}

/// Upcoming calls of one store operation: pass `skip`, then fail `fail`.
#[derive(Debug, Default, Clone, Copy)]
struct Fault {
    skip: usize,
    fail: usize,
}

impl Fault {
    fn trips(&mut self) -> bool {
        if self.skip > 0 {
            self.skip -= 1;
            false
        } else if self.fail > 0 {
            self.fail -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    task_writes: Fault,
    event_appends: Fault,
    task_listings: Fault,
    stale_jobs: HashMap<JobId, (Job, usize)>,
}

/// In-memory store that fails scripted calls like an unreachable database.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryJobStore,
    faults: Mutex<Faults>,
}

impl FaultyStore {
    /// Store with no faults scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing store, for seeding and inspection without faults.
    pub const fn inner(&self) -> &InMemoryJobStore {
        &self.inner
    }

    /// Lets `skip` task writes through, then fails the next `fail`.
    pub fn fail_task_writes(&self, skip: usize, fail: usize) {
        self.faults.lock().expect("faults").task_writes = Fault { skip, fail };
    }

    /// Lets `skip` event appends through, then fails the next `fail`.
    pub fn fail_event_appends(&self, skip: usize, fail: usize) {
        self.faults.lock().expect("faults").event_appends = Fault { skip, fail };
    }

    /// Fails the next `fail` task listings.
    pub fn fail_task_listings(&self, fail: usize) {
        self.faults.lock().expect("faults").task_listings = Fault { skip: 0, fail };
    }

    /// Answers the next `reads` lookups of the job with `snapshot`.
    pub fn serve_stale_job(&self, snapshot: Job, reads: usize) {
        self.faults
            .lock()
            .expect("faults")
            .stale_jobs
            .insert(snapshot.id(), (snapshot, reads));
    }

    fn trips(&self, pick: impl FnOnce(&mut Faults) -> &mut Fault) -> StoreResult<()> {
        let mut faults = self.faults.lock().expect("faults");
        if pick(&mut faults).trips() {
            return Err(StoreError::persistence(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store unavailable",
            )));
        }
        Ok(())
    }

    fn stale_job(&self, id: JobId) -> Option<Job> {
        let mut faults = self.faults.lock().expect("faults");
        let (snapshot, reads) = faults.stale_jobs.get_mut(&id)?;
        let job = snapshot.clone();
        *reads -= 1;
        if *reads == 0 {
            faults.stale_jobs.remove(&id);
        }
        Some(job)
    }
}

#[async_trait]
impl JobStore for FaultyStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        self.inner.insert_job(job).await
    }

    async fn update_job(&self, job: &Job) -> StoreResult<()> {
        self.inner.update_job(job).await
    }

    async fn update_job_if_status(&self, job: &Job, expected: JobStatus) -> StoreResult<bool> {
        self.inner.update_job_if_status(job, expected).await
    }

    async fn find_job(&self, id: JobId) -> StoreResult<Option<Job>> {
        if let Some(job) = self.stale_job(id) {
            return Ok(Some(job));
        }
        self.inner.find_job(id).await
    }

    async fn list_jobs(&self, status: Option<JobStatus>) -> StoreResult<Vec<Job>> {
        self.inner.list_jobs(status).await
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        self.inner.insert_tasks(tasks).await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        self.trips(|faults| &mut faults.task_writes)?;
        self.inner.update_task(task).await
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.inner.find_task(id).await
    }

    async fn tasks_for_job(&self, job_id: JobId) -> StoreResult<Vec<Task>> {
        self.trips(|faults| &mut faults.task_listings)?;
        self.inner.tasks_for_job(job_id).await
    }

    async fn append_event(&self, event: &TaskEvent) -> StoreResult<()> {
        self.trips(|faults| &mut faults.event_appends)?;
        self.inner.append_event(event).await
    }

    async fn events_for_task(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>> {
        self.inner.events_for_task(task_id).await
    }

    async fn acquire_run_lease(
        &self,
        job_id: JobId,
        holder: LeaseHolder,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.inner
            .acquire_run_lease(job_id, holder, now, stale_before)
            .await
    }

    async fn release_run_lease(&self, job_id: JobId, holder: LeaseHolder) -> StoreResult<()> {
        self.inner.release_run_lease(job_id, holder).await
    }
}
