//! Shared helpers for in-memory integration tests.

use conductor::agent::adapters::ScriptedAgent;
use conductor::job::{
    adapters::memory::InMemoryJobStore,
    domain::{JobId, JobStatus, Task, TaskId, TaskRole},
    ports::JobStore,
};
use conductor::orchestration::{
    domain::OrchestrationPolicy,
    services::{JobService, Orchestrator},
};
use conductor::planner::{
    adapters::FixedPlanGenerator,
    domain::{Plan, PlanPhase, PlannedTask},
    services::PlannerService,
};
use conductor::source_control::adapters::DisabledSourceControl;
use mockable::DefaultClock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Service type wired with in-memory and scripted adapters.
pub type TestService = JobService<
    InMemoryJobStore,
    FixedPlanGenerator,
    ScriptedAgent,
    DisabledSourceControl,
    DefaultClock,
>;

const WAIT_LIMIT: Duration = Duration::from_secs(5);
const POLL_STEP: Duration = Duration::from_millis(5);

/// Service plus handles on its store and agent.
pub struct Harness {
    pub store: Arc<InMemoryJobStore>,
    pub agent: ScriptedAgent,
    pub service: Arc<TestService>,
}

/// Builds a harness whose planner always answers with `plan`.
#[must_use]
pub fn harness(plan: Plan) -> Harness {
    let store = Arc::new(InMemoryJobStore::new());
    let agent = ScriptedAgent::new();
    let clock = Arc::new(DefaultClock);
    let policy = OrchestrationPolicy::default()
        .with_poll_interval(POLL_STEP)
        .with_retry_delay(Duration::ZERO);
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        Arc::new(agent.clone()),
        Arc::clone(&clock),
        policy,
    ));
    let service = Arc::new(JobService::new(
        Arc::clone(&store),
        PlannerService::new(Arc::new(FixedPlanGenerator::new(plan))),
        Arc::new(DisabledSourceControl),
        orchestrator,
        clock,
    ));
    Harness {
        store,
        agent,
        service,
    }
}

/// Builds a one-phase plan.
#[must_use]
pub fn plan(tasks: Vec<PlannedTask>) -> Plan {
    Plan {
        phases: vec![PlanPhase {
            name: "Implementation".to_owned(),
            tasks,
        }],
    }
}

/// Builds a planned task whose title equals its local id.
#[must_use]
pub fn planned(id: &str, role: TaskRole, dependencies: &[&str]) -> PlannedTask {
    PlannedTask {
        id: id.to_owned(),
        title: id.to_owned(),
        objective: format!("Deliver {id}"),
        role,
        dependencies: dependencies.iter().map(|dep| (*dep).to_owned()).collect(),
        files: Vec::new(),
        definition_of_done: Some("Tests pass".to_owned()),
    }
}

/// Polls a task until `accept` holds.
///
/// # Errors
///
/// Returns an error when the task is missing or the condition does not hold
/// in time.
pub async fn wait_for_task(
    store: &InMemoryJobStore,
    task_id: TaskId,
    accept: impl Fn(&Task) -> bool,
) -> eyre::Result<Task> {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let task = store
            .find_task(task_id)
            .await?
            .ok_or_else(|| eyre::eyre!("task {task_id} missing"))?;
        if accept(&task) {
            return Ok(task);
        }
        eyre::ensure!(
            Instant::now() < deadline,
            "task {task_id} stuck in {}",
            task.status()
        );
        tokio::time::sleep(POLL_STEP).await;
    }
}

/// Polls a job until it reaches `status`.
///
/// # Errors
///
/// Returns an error when the job is missing or never reaches `status`.
pub async fn wait_for_job(
    store: &InMemoryJobStore,
    job_id: JobId,
    status: JobStatus,
) -> eyre::Result<()> {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let job = store
            .find_job(job_id)
            .await?
            .ok_or_else(|| eyre::eyre!("job {job_id} missing"))?;
        if job.status() == status {
            return Ok(());
        }
        eyre::ensure!(
            Instant::now() < deadline,
            "job {job_id} stuck in {}",
            job.status()
        );
        tokio::time::sleep(POLL_STEP).await;
    }
}
