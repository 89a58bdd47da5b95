//! Externally delivered task outcome.

use crate::job::domain::{RunId, TaskId, TaskOutcome};
use serde_json::Value;

/// Definitive outcome reported by the execution agent for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSignal {
    task_id: TaskId,
    run_id: Option<RunId>,
    outcome: TaskOutcome,
    result: Option<Value>,
    error: Option<String>,
}

impl CompletionSignal {
    /// Creates a signal reporting `outcome` for `task_id`.
    #[must_use]
    pub const fn new(task_id: TaskId, outcome: TaskOutcome) -> Self {
        Self {
            task_id,
            run_id: None,
            outcome,
            result: None,
            error: None,
        }
    }

    /// Sets the run the outcome belongs to.
    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Attaches the agent's result payload.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Attaches the agent's error text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the run identifier, if reported.
    #[must_use]
    pub const fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Returns the reported outcome.
    #[must_use]
    pub const fn outcome(&self) -> TaskOutcome {
        self.outcome
    }

    /// Returns the result payload, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error text, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
