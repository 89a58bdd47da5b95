//! Shared world state for orchestration BDD scenarios.

use conductor::agent::adapters::ScriptedAgent;
use conductor::job::{
    adapters::memory::InMemoryJobStore,
    domain::{Job, Task, TaskId},
    ports::JobStore,
};
use conductor::orchestration::{
    domain::{LoopExit, OrchestrationPolicy},
    services::{JobService, OrchestrationResult, Orchestrator},
};
use conductor::planner::{
    adapters::FixedPlanGenerator,
    domain::{Plan, PlanPhase, PlannedTask},
    services::PlannerService,
};
use conductor::source_control::adapters::DisabledSourceControl;
use mockable::DefaultClock;
use rstest::fixture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Service type used by the BDD world.
pub type TestJobService = JobService<
    InMemoryJobStore,
    FixedPlanGenerator,
    ScriptedAgent,
    DisabledSourceControl,
    DefaultClock,
>;

const WAIT_LIMIT: Duration = Duration::from_secs(5);
const POLL_STEP: Duration = Duration::from_millis(5);

/// Scenario world for orchestration behaviour tests.
pub struct OrchestrationWorld {
    pub store: Arc<InMemoryJobStore>,
    pub agent: ScriptedAgent,
    pub planned: Vec<PlannedTask>,
    pub service: Option<TestJobService>,
    pub job: Option<Job>,
    pub task_ids: HashMap<String, TaskId>,
    pub loop_handle: Option<JoinHandle<OrchestrationResult<LoopExit>>>,
}

impl OrchestrationWorld {
    /// Creates a world with an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryJobStore::new()),
            agent: ScriptedAgent::new(),
            planned: Vec::new(),
            service: None,
            job: None,
            task_ids: HashMap::new(),
            loop_handle: None,
        }
    }

    /// Builds the job service answering with the planned tasks.
    pub fn build_service(&mut self) -> &TestJobService {
        let plan = Plan {
            phases: vec![PlanPhase {
                name: "Scenario".to_owned(),
                tasks: self.planned.clone(),
            }],
        };
        let clock = Arc::new(DefaultClock);
        let policy = OrchestrationPolicy::default()
            .with_poll_interval(POLL_STEP)
            .with_retry_delay(Duration::ZERO);
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&self.store),
            Arc::new(self.agent.clone()),
            Arc::clone(&clock),
            policy,
        ));
        self.service.insert(JobService::new(
            Arc::clone(&self.store),
            PlannerService::new(Arc::new(FixedPlanGenerator::new(plan))),
            Arc::new(DisabledSourceControl),
            orchestrator,
            clock,
        ))
    }

    /// Returns the service built by the submit step.
    ///
    /// # Errors
    ///
    /// Returns an error when no job was submitted yet.
    pub fn service(&self) -> Result<&TestJobService, eyre::Report> {
        self.service
            .as_ref()
            .ok_or_else(|| eyre::eyre!("job service not built; submit a job first"))
    }

    /// Returns the submitted job.
    ///
    /// # Errors
    ///
    /// Returns an error when no job was submitted yet.
    pub fn job(&self) -> Result<&Job, eyre::Report> {
        self.job
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing submitted job in scenario world"))
    }

    /// Resolves a planned task name to its persisted identifier.
    ///
    /// # Errors
    ///
    /// Returns an error for a name the plan did not contain.
    pub fn task_id(&self, name: &str) -> Result<TaskId, eyre::Report> {
        self.task_ids
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown task '{name}' in scenario"))
    }

    /// Reads the current state of a task.
    ///
    /// # Errors
    ///
    /// Returns an error when the task cannot be loaded.
    pub async fn task(&self, name: &str) -> Result<Task, eyre::Report> {
        let task_id = self.task_id(name)?;
        self.store
            .find_task(task_id)
            .await?
            .ok_or_else(|| eyre::eyre!("task '{name}' disappeared from the store"))
    }

    /// Polls a task until `accept` holds.
    ///
    /// # Errors
    ///
    /// Returns an error when the condition does not hold in time.
    pub async fn wait_for_task(
        &self,
        name: &str,
        what: &str,
        accept: impl Fn(&Task) -> bool,
    ) -> Result<Task, eyre::Report> {
        let deadline = Instant::now() + WAIT_LIMIT;
        loop {
            let task = self.task(name).await?;
            if accept(&task) {
                return Ok(task);
            }
            if Instant::now() >= deadline {
                return Err(eyre::eyre!(
                    "task '{name}' never {what}; last status {}",
                    task.status()
                ));
            }
            tokio::time::sleep(POLL_STEP).await;
        }
    }
}

impl Default for OrchestrationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> OrchestrationWorld {
    OrchestrationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Upper bound for waiting on the background loop.
#[must_use]
pub const fn wait_limit() -> Duration {
    WAIT_LIMIT
}
