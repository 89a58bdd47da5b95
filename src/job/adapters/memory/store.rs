//! Thread-safe in-memory job store for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::job::{
    domain::{Job, JobId, JobStatus, LeaseHolder, Task, TaskEvent, TaskId},
    ports::{JobStore, StoreError, StoreResult},
};

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    jobs: HashMap<JobId, Job>,
    job_order: Vec<JobId>,
    tasks: HashMap<TaskId, Task>,
    job_tasks: HashMap<JobId, Vec<TaskId>>,
    events: HashMap<TaskId, Vec<TaskEvent>>,
    leases: HashMap<JobId, RunLease>,
}

#[derive(Debug, Clone, Copy)]
struct RunLease {
    holder: LeaseHolder,
    renewed_at: DateTime<Utc>,
}

impl InMemoryJobStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, InMemoryState>> {
        self.state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, InMemoryState>> {
        self.state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.jobs.contains_key(&job.id()) {
            return Err(StoreError::DuplicateJob(job.id()));
        }
        state.job_order.push(job.id());
        state.jobs.insert(job.id(), job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> StoreResult<()> {
        let mut state = self.write()?;
        let slot = state
            .jobs
            .get_mut(&job.id())
            .ok_or(StoreError::JobNotFound(job.id()))?;
        *slot = job.clone();
        Ok(())
    }

    async fn update_job_if_status(&self, job: &Job, expected: JobStatus) -> StoreResult<bool> {
        let mut state = self.write()?;
        let slot = state
            .jobs
            .get_mut(&job.id())
            .ok_or(StoreError::JobNotFound(job.id()))?;
        if slot.status() != expected {
            return Ok(false);
        }
        *slot = job.clone();
        Ok(true)
    }

    async fn find_job(&self, id: JobId) -> StoreResult<Option<Job>> {
        let state = self.read()?;
        Ok(state.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, status: Option<JobStatus>) -> StoreResult<Vec<Job>> {
        let state = self.read()?;
        let mut jobs: Vec<Job> = state
            .job_order
            .iter()
            .rev()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| status.is_none_or(|wanted| job.status() == wanted))
            .cloned()
            .collect();
        // Stable sort keeps reverse insertion order for equal timestamps.
        jobs.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(jobs)
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        let mut state = self.write()?;
        for (index, task) in tasks.iter().enumerate() {
            if !state.jobs.contains_key(&task.job_id()) {
                return Err(StoreError::JobNotFound(task.job_id()));
            }
            let duplicate_in_batch = tasks
                .iter()
                .take(index)
                .any(|earlier| earlier.id() == task.id());
            if state.tasks.contains_key(&task.id()) || duplicate_in_batch {
                return Err(StoreError::DuplicateTask(task.id()));
            }
        }

        for task in tasks {
            state
                .job_tasks
                .entry(task.job_id())
                .or_default()
                .push(task.id());
            state.tasks.insert(task.id(), task.clone());
        }
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.tasks.entry(task.id()) {
            Entry::Occupied(mut slot) => {
                slot.insert(task.clone());
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::TaskNotFound(task.id())),
        }
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn tasks_for_job(&self, job_id: JobId) -> StoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .job_tasks
            .get(&job_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.tasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        tasks.sort_by_key(|task| (task.created_at(), task.position()));
        Ok(tasks)
    }

    async fn append_event(&self, event: &TaskEvent) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&event.task_id()) {
            return Err(StoreError::TaskNotFound(event.task_id()));
        }
        state
            .events
            .entry(event.task_id())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn events_for_task(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>> {
        let state = self.read()?;
        Ok(state.events.get(&task_id).cloned().unwrap_or_default())
    }

    async fn acquire_run_lease(
        &self,
        job_id: JobId,
        holder: LeaseHolder,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        let claimed = RunLease {
            holder,
            renewed_at: now,
        };
        match state.leases.entry(job_id) {
            Entry::Occupied(mut current) => {
                let lease = current.get();
                if lease.holder != holder && lease.renewed_at >= stale_before {
                    return Ok(false);
                }
                current.insert(claimed);
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(claimed);
                Ok(true)
            }
        }
    }

    async fn release_run_lease(&self, job_id: JobId, holder: LeaseHolder) -> StoreResult<()> {
        let mut state = self.write()?;
        if state
            .leases
            .get(&job_id)
            .is_some_and(|lease| lease.holder == holder)
        {
            state.leases.remove(&job_id);
        }
        Ok(())
    }
}
