//! In-memory execution agent with scripted launch failures.

use crate::agent::{
    domain::LaunchRequest,
    ports::{AgentError, AgentResult, ExecutionAgent},
};
use crate::job::domain::{RunId, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Execution agent that records launches and acknowledges them locally.
///
/// Launches succeed with a generated run reference unless failures were
/// scripted for the task. Outcomes are never reported back on their own;
/// callers deliver completion signals explicitly.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    launches: Vec<LaunchRequest>,
    pending_failures: HashMap<TaskId, u32>,
    reject_all: bool,
}

impl ScriptedAgent {
    /// Creates an agent whose launches all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AgentResult<MutexGuard<'_, ScriptState>> {
        self.state
            .lock()
            .map_err(|err| AgentError::unavailable(std::io::Error::other(err.to_string())))
    }

    /// Makes the next `count` launches of `task_id` fail.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unavailable`] when the script state is poisoned.
    pub fn fail_next_launches(&self, task_id: TaskId, count: u32) -> AgentResult<()> {
        let mut state = self.lock()?;
        *state.pending_failures.entry(task_id).or_default() += count;
        Ok(())
    }

    /// Makes every later launch fail.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unavailable`] when the script state is poisoned.
    pub fn reject_all_launches(&self) -> AgentResult<()> {
        self.lock()?.reject_all = true;
        Ok(())
    }

    /// Returns every launch request received, in order.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unavailable`] when the script state is poisoned.
    pub fn launches(&self) -> AgentResult<Vec<LaunchRequest>> {
        Ok(self.lock()?.launches.clone())
    }

    /// Returns the number of launches received for `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unavailable`] when the script state is poisoned.
    pub fn launch_count(&self, task_id: TaskId) -> AgentResult<usize> {
        Ok(self
            .lock()?
            .launches
            .iter()
            .filter(|launch| launch.task_id() == task_id)
            .count())
    }
}

#[async_trait]
impl ExecutionAgent for ScriptedAgent {
    async fn launch(&self, request: &LaunchRequest) -> AgentResult<RunId> {
        let mut state = self.lock()?;
        state.launches.push(request.clone());
        let attempt = state
            .launches
            .iter()
            .filter(|launch| launch.task_id() == request.task_id())
            .count();

        let scripted_failure = match state.pending_failures.get_mut(&request.task_id()) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if state.reject_all || scripted_failure {
            return Err(AgentError::Rejected {
                status: 503,
                message: format!("scripted launch failure for task {}", request.task_id()),
            });
        }

        RunId::new(format!("scripted-{}-{attempt}", request.task_id()))
            .map_err(|err| AgentError::InvalidResponse(err.to_string()))
    }
}
