//! Per-job orchestration loop.

use super::{
    CompletionHandler, Dispatcher, OrchestrationError, OrchestrationResult, TaskLocks,
    compute_ready,
};
use crate::agent::ports::ExecutionAgent;
use crate::job::{
    domain::{FailureDisposition, JobId, JobStatus, LeaseHolder, RunId, Task, TaskId, TaskStatus},
    ports::JobStore,
};
use crate::orchestration::domain::{
    CompletionSignal, DispatchReport, LoopExit, OrchestrationPolicy, SignalDisposition,
    TickOutcome,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives jobs through resolve, dispatch and completion ticks.
///
/// One instance serves every job. Loops for different jobs run
/// independently; the run lease keeps a single loop per job.
pub struct Orchestrator<S, A, C>
where
    S: JobStore,
    A: ExecutionAgent,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    policy: OrchestrationPolicy,
    locks: TaskLocks,
    dispatcher: Dispatcher<S, A, C>,
    completion: CompletionHandler<S, C>,
}

impl<S, A, C> Orchestrator<S, A, C>
where
    S: JobStore,
    A: ExecutionAgent,
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator applying `policy`.
    #[must_use]
    pub fn new(store: Arc<S>, agent: Arc<A>, clock: Arc<C>, policy: OrchestrationPolicy) -> Self {
        let locks = TaskLocks::new();
        let completion = CompletionHandler::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            locks.clone(),
            policy.retry_delay(),
        );
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            agent,
            Arc::clone(&clock),
            locks.clone(),
            completion.clone(),
            policy.max_concurrency(),
        );
        Self {
            store,
            clock,
            policy,
            locks,
            dispatcher,
            completion,
        }
    }

    /// Returns the policy in force.
    #[must_use]
    pub const fn policy(&self) -> &OrchestrationPolicy {
        &self.policy
    }

    /// Runs the loop for `job_id` until the job stops running.
    ///
    /// The run lease is renewed before every tick; the loop stops with
    /// [`LoopExit::LeaseLost`] when another loop took the lease over after
    /// it expired. A failed tick is logged and retried after the poll
    /// interval.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::AlreadyRunning`] when another loop
    /// holds a live run lease for the job, or a store error when the lease
    /// cannot be claimed.
    pub async fn run(&self, job_id: JobId) -> OrchestrationResult<LoopExit> {
        let holder = LeaseHolder::new();
        if !self.claim_lease(job_id, holder).await? {
            return Err(OrchestrationError::AlreadyRunning(job_id));
        }
        info!(%job_id, %holder, "orchestration loop started");

        let exit = self.drive(job_id, holder).await;

        if let Err(err) = self.store.release_run_lease(job_id, holder).await {
            warn!(%job_id, error = %err, "failed to release run lease");
        }
        info!(%job_id, ?exit, "orchestration loop stopped");
        Ok(exit)
    }

    /// Runs the loop for `job_id`, waiting while another loop holds its
    /// lease.
    ///
    /// Used to restart loops after a pause or a process restart: the wait
    /// ends when the other loop releases the lease, when the lease expires,
    /// or when the job is no longer running.
    ///
    /// # Errors
    ///
    /// Returns a store error when the lease cannot be claimed.
    pub async fn adopt(&self, job_id: JobId) -> OrchestrationResult<LoopExit> {
        loop {
            match self.run(job_id).await {
                Err(OrchestrationError::AlreadyRunning(_)) => {
                    if let Some(exit) = self.check_running(job_id).await? {
                        return Ok(exit);
                    }
                    debug!(%job_id, "run lease held elsewhere; waiting");
                    tokio::time::sleep(self.policy.poll_interval()).await;
                }
                other => return other,
            }
        }
    }

    async fn claim_lease(&self, job_id: JobId, holder: LeaseHolder) -> OrchestrationResult<bool> {
        let now = self.clock.utc();
        Ok(self
            .store
            .acquire_run_lease(job_id, holder, now, lease_cutoff(now, &self.policy))
            .await?)
    }

    async fn drive(&self, job_id: JobId, holder: LeaseHolder) -> LoopExit {
        loop {
            match self.claim_lease(job_id, holder).await {
                Ok(true) => match self.tick(job_id).await {
                    Ok(TickOutcome::Stop(exit)) => return exit,
                    Ok(TickOutcome::Continue) => {}
                    Err(err) => warn!(%job_id, error = %err, "tick failed; retrying"),
                },
                Ok(false) => {
                    warn!(%job_id, %holder, "run lease taken over; stopping loop");
                    return LoopExit::LeaseLost;
                }
                Err(err) => warn!(%job_id, error = %err, "lease renewal failed; retrying"),
            }
            tokio::time::sleep(self.policy.poll_interval()).await;
        }
    }

    /// Performs one tick for `job_id`.
    ///
    /// Returns overdue retries to `pending` and unlaunched tasks to
    /// `ready`, promotes eligible tasks to `ready`, dispatches within the
    /// ceiling, then finalizes the job once at least one task exists and
    /// every task is terminal.
    ///
    /// # Errors
    ///
    /// Propagates store and domain failures. Nothing is assumed persisted
    /// after an error; the next tick re-evaluates from the store.
    pub async fn tick(&self, job_id: JobId) -> OrchestrationResult<TickOutcome> {
        if let Some(exit) = self.check_running(job_id).await? {
            return Ok(TickOutcome::Stop(exit));
        }

        let mut tasks = self.store.tasks_for_job(job_id).await?;
        self.completion.requeue_due_retries(&mut tasks).await?;
        self.dispatcher.requeue_unlaunched(&mut tasks).await?;
        self.promote_ready(&mut tasks).await?;
        let report = self.dispatcher.dispatch(&tasks).await?;
        log_dispatch(job_id, &report);

        let settled = self.store.tasks_for_job(job_id).await?;
        self.finalize(job_id, &settled).await
    }

    async fn check_running(&self, job_id: JobId) -> OrchestrationResult<Option<LoopExit>> {
        let Some(job) = self.store.find_job(job_id).await? else {
            warn!(%job_id, "job disappeared; stopping loop");
            return Ok(Some(LoopExit::JobMissing));
        };
        let status = job.status();
        if status.is_terminal() {
            return Ok(Some(LoopExit::Finished(status)));
        }
        if status != JobStatus::Running {
            return Ok(Some(LoopExit::Suspended(status)));
        }
        Ok(None)
    }

    async fn promote_ready(&self, tasks: &mut [Task]) -> OrchestrationResult<()> {
        let ready = compute_ready(tasks);
        for slot in tasks.iter_mut().filter(|task| ready.contains(&task.id())) {
            let task_id = slot.id();
            let _guard = self.locks.acquire(task_id).await;
            let Some(mut task) = self.store.find_task(task_id).await? else {
                continue;
            };
            if task.status() == TaskStatus::Pending {
                task.transition_to(TaskStatus::Ready, &*self.clock)?;
                self.store.update_task(&task).await?;
                debug!(%task_id, "task ready");
            }
            *slot = task;
        }
        Ok(())
    }

    async fn finalize(&self, job_id: JobId, tasks: &[Task]) -> OrchestrationResult<TickOutcome> {
        if tasks.is_empty() || !tasks.iter().all(|task| task.status().is_terminal()) {
            return Ok(TickOutcome::Continue);
        }

        let Some(mut job) = self.store.find_job(job_id).await? else {
            return Ok(TickOutcome::Stop(LoopExit::JobMissing));
        };
        if job.status() != JobStatus::Running {
            return Ok(TickOutcome::Stop(LoopExit::Suspended(job.status())));
        }

        let failed = tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Failed)
            .count();
        if failed == 0 {
            job.transition_to(JobStatus::Succeeded, &*self.clock)?;
        } else {
            job.fail(
                format!("{failed} of {} tasks failed", tasks.len()),
                &*self.clock,
            )?;
        }
        if !self
            .store
            .update_job_if_status(&job, JobStatus::Running)
            .await?
        {
            debug!(%job_id, "job changed status while finishing; re-checking next tick");
            return Ok(TickOutcome::Continue);
        }
        info!(%job_id, status = %job.status(), tasks = tasks.len(), failed, "job finished");
        Ok(TickOutcome::Stop(LoopExit::Finished(job.status())))
    }

    /// Applies a completion signal immediately, independent of any tick.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] for an unknown task and
    /// propagates store failures.
    pub async fn handle_signal(
        &self,
        signal: &CompletionSignal,
    ) -> OrchestrationResult<SignalDisposition> {
        self.completion.apply_signal(signal).await
    }

    /// Routes an externally reported attempt failure through the retry
    /// path.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] for an unknown task and
    /// propagates store failures.
    pub async fn handle_failure(
        &self,
        task_id: TaskId,
        run_id: Option<&RunId>,
        error: &str,
    ) -> OrchestrationResult<Option<FailureDisposition>> {
        self.completion.record_failure(task_id, run_id, error).await
    }
}

fn log_dispatch(job_id: JobId, report: &DispatchReport) {
    if !report.launched.is_empty() || !report.failed.is_empty() {
        debug!(
            %job_id,
            launched = report.launched.len(),
            failed = report.failed.len(),
            "dispatch pass complete"
        );
    }
}

fn lease_cutoff(now: DateTime<Utc>, policy: &OrchestrationPolicy) -> DateTime<Utc> {
    let ttl = TimeDelta::from_std(policy.lease_ttl()).unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
