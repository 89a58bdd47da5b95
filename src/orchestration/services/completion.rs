//! Failure and completion paths for task outcomes.

use super::{OrchestrationError, OrchestrationResult, TaskLocks};
use crate::job::{
    domain::{
        FailureDisposition, RunId, Task, TaskEvent, TaskEventKind, TaskId, TaskOutcome, TaskStatus,
    },
    ports::JobStore,
};
use crate::orchestration::domain::{CompletionSignal, SignalDisposition};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Applies execution outcomes to tasks.
///
/// The failure path consumes an attempt and schedules a retry; the
/// completion path records an authoritative terminal outcome. Both are
/// no-ops for tasks that can no longer accept them, so duplicate delivery
/// is harmless.
pub struct CompletionHandler<S, C>
where
    S: JobStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    locks: TaskLocks,
    retry_delay: Duration,
}

impl<S, C> Clone for CompletionHandler<S, C>
where
    S: JobStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            locks: self.locks.clone(),
            retry_delay: self.retry_delay,
        }
    }
}

impl<S, C> CompletionHandler<S, C>
where
    S: JobStore,
    C: Clock + Send + Sync,
{
    /// Creates a handler sharing `locks` with the rest of the engine.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, locks: TaskLocks, retry_delay: Duration) -> Self {
        Self {
            store,
            clock,
            locks,
            retry_delay,
        }
    }

    /// Records a failed attempt of a running task.
    ///
    /// When attempts remain, the task is `retrying` until the retry delay
    /// elapses and then returns to `pending`; this call waits for that
    /// delay. If the wait is cut short or the revert cannot be written, the
    /// loop reverts the task on a later tick through
    /// [`Self::requeue_due_retries`]. Returns `None` without changes when the
    /// task is not running or `run_id` names an older run.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] for an unknown task and
    /// propagates store failures.
    pub async fn record_failure(
        &self,
        task_id: TaskId,
        run_id: Option<&RunId>,
        error: &str,
    ) -> OrchestrationResult<Option<FailureDisposition>> {
        let guard = self.locks.acquire(task_id).await;
        let mut task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(OrchestrationError::TaskNotFound(task_id))?;

        if task.status() != TaskStatus::Running {
            debug!(%task_id, status = %task.status(), "ignoring failure for task that is not running");
            return Ok(None);
        }
        if is_stale(task.run_id(), run_id) {
            debug!(%task_id, "ignoring failure for a previous run");
            return Ok(None);
        }

        let disposition = task.record_failed_attempt(error, &*self.clock)?;
        self.store.update_task(&task).await?;

        let (kind, attempt) = match disposition {
            FailureDisposition::Retrying { attempt } => (TaskEventKind::Retrying, attempt),
            FailureDisposition::Exhausted { attempt } => (TaskEventKind::Failed, attempt),
        };
        let metadata = json!({
            "attempt": attempt,
            "max_attempts": task.max_attempts(),
            "error": error,
        });
        self.store
            .append_event(&TaskEvent::new(task_id, kind, metadata, &*self.clock))
            .await?;
        drop(guard);

        match disposition {
            FailureDisposition::Exhausted { .. } => {
                warn!(%task_id, attempt, error, "task failed after exhausting its attempts");
                self.locks.forget(task_id);
            }
            FailureDisposition::Retrying { .. } => {
                info!(%task_id, attempt, max_attempts = task.max_attempts(), error, "task will be retried");
                tokio::time::sleep(self.retry_delay).await;
                if let Err(err) = self.return_to_pending(task_id).await {
                    warn!(%task_id, error = %err, "retry revert deferred to the next tick");
                }
            }
        }
        Ok(Some(disposition))
    }

    /// Returns every `retrying` task in `tasks` whose retry delay has
    /// elapsed to `pending`, updating the slice in place.
    ///
    /// # Errors
    ///
    /// Propagates store and domain failures.
    pub async fn requeue_due_retries(&self, tasks: &mut [Task]) -> OrchestrationResult<usize> {
        let now = self.clock.utc();
        let mut requeued = 0;
        for slot in tasks
            .iter_mut()
            .filter(|task| task.retry_due(self.retry_delay, now))
        {
            let task_id = slot.id();
            let _guard = self.locks.acquire(task_id).await;
            let Some(mut task) = self.store.find_task(task_id).await? else {
                continue;
            };
            if task.retry_due(self.retry_delay, now) {
                task.transition_to(TaskStatus::Pending, &*self.clock)?;
                self.store.update_task(&task).await?;
                debug!(%task_id, "overdue retry returned to pending");
                requeued += 1;
            }
            *slot = task;
        }
        Ok(requeued)
    }

    async fn return_to_pending(&self, task_id: TaskId) -> OrchestrationResult<()> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(OrchestrationError::TaskNotFound(task_id))?;
        // A completion signal may have finished the task during the delay.
        if task.status() != TaskStatus::Retrying {
            return Ok(());
        }
        task.transition_to(TaskStatus::Pending, &*self.clock)?;
        self.store.update_task(&task).await?;
        debug!(%task_id, "task returned to pending");
        Ok(())
    }

    /// Applies an externally reported outcome.
    ///
    /// Does not consume an attempt.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] for an unknown task and
    /// propagates store failures.
    pub async fn apply_signal(
        &self,
        signal: &CompletionSignal,
    ) -> OrchestrationResult<SignalDisposition> {
        let task_id = signal.task_id();
        let guard = self.locks.acquire(task_id).await;
        let mut task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(OrchestrationError::TaskNotFound(task_id))?;

        if task.status().is_terminal() {
            debug!(%task_id, "ignoring duplicate completion signal");
            return Ok(SignalDisposition::Duplicate);
        }
        if is_stale(task.run_id(), signal.run_id()) {
            warn!(
                %task_id,
                run_id = signal.run_id().map(RunId::as_str),
                "ignoring completion signal for a previous run"
            );
            return Ok(SignalDisposition::Stale);
        }

        task.complete(
            signal.outcome(),
            signal.error().map(str::to_owned),
            &*self.clock,
        )?;
        self.store.update_task(&task).await?;

        let kind = match signal.outcome() {
            TaskOutcome::Completed => TaskEventKind::Completed,
            TaskOutcome::Failed => TaskEventKind::Failed,
        };
        let metadata = json!({
            "run_id": signal.run_id().map(RunId::as_str),
            "outcome": signal.outcome(),
            "result": signal.result(),
            "error": signal.error(),
        });
        self.store
            .append_event(&TaskEvent::new(task_id, kind, metadata, &*self.clock))
            .await?;
        drop(guard);
        self.locks.forget(task_id);

        info!(%task_id, status = %task.status(), "task outcome recorded");
        Ok(SignalDisposition::Applied(task.status()))
    }
}

fn is_stale(recorded: Option<&RunId>, reported: Option<&RunId>) -> bool {
    matches!((recorded, reported), (Some(current), Some(signalled)) if current != signalled)
}
