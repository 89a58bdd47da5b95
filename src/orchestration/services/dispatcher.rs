//! Concurrency-limited dispatch of ready tasks.

use super::{CompletionHandler, OrchestrationResult, TaskLocks};
use crate::agent::{domain::LaunchRequest, ports::ExecutionAgent};
use crate::job::{
    domain::{Task, TaskEvent, TaskEventKind, TaskStatus},
    ports::JobStore,
};
use crate::orchestration::domain::DispatchReport;
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Hands `ready` tasks to the execution agent.
pub struct Dispatcher<S, A, C>
where
    S: JobStore,
    A: ExecutionAgent,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    agent: Arc<A>,
    clock: Arc<C>,
    locks: TaskLocks,
    completion: CompletionHandler<S, C>,
    max_concurrency: usize,
}

impl<S, A, C> Dispatcher<S, A, C>
where
    S: JobStore,
    A: ExecutionAgent,
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher launching at most `max_concurrency` tasks at a
    /// time. Launch failures are routed to `completion`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        agent: Arc<A>,
        clock: Arc<C>,
        locks: TaskLocks,
        completion: CompletionHandler<S, C>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            agent,
            clock,
            locks,
            completion,
            max_concurrency,
        }
    }

    /// Launches `ready` tasks from `tasks` in their given order.
    ///
    /// Tasks already `running` count against the ceiling. A launch failure
    /// is recorded as a failed attempt.
    ///
    /// # Errors
    ///
    /// Propagates store failures. A task left `running` without a run
    /// reference by such a failure is picked up again by
    /// [`Self::requeue_unlaunched`].
    pub async fn dispatch(&self, tasks: &[Task]) -> OrchestrationResult<DispatchReport> {
        let running = tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Running)
            .count();
        let capacity = self.max_concurrency.saturating_sub(running);
        let selected: Vec<&Task> = tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Ready)
            .take(capacity)
            .collect();

        let mut report = DispatchReport::default();
        for candidate in selected {
            let task_id = candidate.id();
            let guard = self.locks.acquire(task_id).await;
            let Some(mut task) = self.store.find_task(task_id).await? else {
                continue;
            };
            if task.status() != TaskStatus::Ready {
                continue;
            }

            task.transition_to(TaskStatus::Running, &*self.clock)?;
            self.store.update_task(&task).await?;
            let metadata = json!({
                "role": task.role(),
                "attempt": task.attempt_count().saturating_add(1),
            });
            self.store
                .append_event(&TaskEvent::new(
                    task_id,
                    TaskEventKind::Started,
                    metadata,
                    &*self.clock,
                ))
                .await?;

            match self.agent.launch(&LaunchRequest::from_task(&task)).await {
                Ok(run_id) => {
                    info!(%task_id, job_id = %task.job_id(), run_id = run_id.as_str(), "task launched");
                    task.record_run(run_id, &*self.clock);
                    self.store.update_task(&task).await?;
                    report.launched.push(task_id);
                }
                Err(err) => {
                    warn!(%task_id, job_id = %task.job_id(), error = %err, "task launch failed");
                    drop(guard);
                    self.completion
                        .record_failure(task_id, None, &err.to_string())
                        .await?;
                    report.failed.push(task_id);
                }
            }
        }
        Ok(report)
    }

    /// Hands `running` tasks without a run reference back to `ready`.
    ///
    /// Such a task was marked `running` by a dispatch pass that stopped
    /// before the agent acknowledged the launch. Only the loop holding the
    /// job's lease dispatches, so between passes no launch is in flight.
    ///
    /// # Errors
    ///
    /// Propagates store and domain failures.
    pub async fn requeue_unlaunched(&self, tasks: &mut [Task]) -> OrchestrationResult<usize> {
        let mut requeued = 0;
        for slot in tasks.iter_mut().filter(|task| task.is_unlaunched()) {
            let task_id = slot.id();
            let _guard = self.locks.acquire(task_id).await;
            let Some(mut task) = self.store.find_task(task_id).await? else {
                continue;
            };
            if task.is_unlaunched() {
                task.requeue_unlaunched(&*self.clock)?;
                self.store.update_task(&task).await?;
                warn!(%task_id, job_id = %task.job_id(), "requeued task stranded before launch");
                requeued += 1;
            }
            *slot = task;
        }
        Ok(requeued)
    }
}
