//! Plan shapes exchanged with the plan generator.

use crate::job::domain::{BranchName, TaskRole};
use serde::{Deserialize, Serialize};

/// Input to a single planning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    goal: String,
    repository: String,
    base_branch: BranchName,
    repository_context: Option<String>,
}

impl PlanRequest {
    /// Creates a request for `goal` against `repository` at `base_branch`.
    #[must_use]
    pub fn new(
        goal: impl Into<String>,
        repository: impl Into<String>,
        base_branch: BranchName,
    ) -> Self {
        Self {
            goal: goal.into(),
            repository: repository.into(),
            base_branch,
            repository_context: None,
        }
    }

    /// Attaches free-text repository context for the generator.
    #[must_use]
    pub fn with_repository_context(mut self, context: impl Into<String>) -> Self {
        self.repository_context = Some(context.into());
        self
    }

    /// Returns the goal text.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Returns the repository reference.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the base branch.
    #[must_use]
    pub const fn base_branch(&self) -> &BranchName {
        &self.base_branch
    }

    /// Returns the optional repository context.
    #[must_use]
    pub fn repository_context(&self) -> Option<&str> {
        self.repository_context.as_deref()
    }
}

/// Phased plan produced by a generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Phases in execution order.
    pub phases: Vec<PlanPhase>,
}

impl Plan {
    /// Iterates over every planned task in phase order.
    pub fn tasks(&self) -> impl Iterator<Item = &PlannedTask> {
        self.phases.iter().flat_map(|phase| phase.tasks.iter())
    }

    /// Returns `true` when at least one task carries the tester role.
    #[must_use]
    pub fn has_tester(&self) -> bool {
        self.tasks().any(|task| task.role == TaskRole::Tester)
    }
}

/// Named group of tasks within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPhase {
    /// Phase name, such as "Implementation".
    pub name: String,
    /// Tasks of the phase in emission order.
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
}

/// Task descriptor with plan-local identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Plan-local identifier.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Objective text.
    pub objective: String,
    /// Assigned role.
    pub role: TaskRole,
    /// Plan-local identifiers of tasks that must succeed first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// File or area hints.
    #[serde(default)]
    pub files: Vec<String>,
    /// Completion criteria.
    #[serde(default)]
    pub definition_of_done: Option<String>,
}
