//! Plan validation and identifier remapping.

use crate::job::domain::{TaskDraft, TaskId};
use crate::planner::{
    domain::{Plan, PlanRequest},
    ports::{PlanGenerator, PlanGeneratorError},
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Service-level planning errors.
#[derive(Debug, Clone, Error)]
pub enum PlanningError {
    /// The generator call failed.
    #[error(transparent)]
    GenerationFailed(#[from] PlanGeneratorError),

    /// The generator returned a plan that cannot be turned into tasks.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

/// Result type for planning operations.
pub type PlanningResult<T> = Result<T, PlanningError>;

/// Produces task drafts for a goal.
#[derive(Clone)]
pub struct PlannerService<G>
where
    G: PlanGenerator,
{
    generator: Arc<G>,
}

impl<G> PlannerService<G>
where
    G: PlanGenerator,
{
    /// Creates a planner service over `generator`.
    #[must_use]
    pub const fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    /// Generates, validates and remaps a plan for `request`.
    ///
    /// Each resulting draft allows `max_attempts` attempts.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::GenerationFailed`] when the generator fails
    /// and [`PlanningError::InvalidPlan`] when a task has a blank or
    /// duplicated plan-local identifier.
    pub async fn plan(
        &self,
        request: &PlanRequest,
        max_attempts: u32,
    ) -> PlanningResult<Vec<TaskDraft>> {
        let plan = self.generator.generate(request).await?;
        validate_plan(&plan)?;
        if !plan.has_tester() {
            warn!(
                repository = request.repository(),
                "plan contains no tester task"
            );
        }

        let drafts = remap_plan(&plan, max_attempts);
        info!(
            phases = plan.phases.len(),
            tasks = drafts.len(),
            "plan accepted"
        );
        Ok(drafts)
    }
}

fn validate_plan(plan: &Plan) -> PlanningResult<()> {
    let mut seen = HashSet::new();
    for task in plan.tasks() {
        let local_id = task.id.trim();
        if local_id.is_empty() {
            return Err(PlanningError::InvalidPlan(format!(
                "task '{}' has a blank identifier",
                task.title
            )));
        }
        if !seen.insert(local_id) {
            return Err(PlanningError::InvalidPlan(format!(
                "duplicate task identifier '{local_id}'"
            )));
        }
    }
    Ok(())
}

/// Remaps plan-local identifiers to fresh task identifiers.
///
/// Tasks are visited in phase order. A dependency resolves only when it
/// names a task visited earlier, so every surviving edge points backwards
/// and the result is acyclic. Unresolved and repeated references are
/// dropped.
#[must_use]
pub fn remap_plan(plan: &Plan, max_attempts: u32) -> Vec<TaskDraft> {
    let mut resolved: HashMap<&str, TaskId> = HashMap::new();
    let mut drafts = Vec::new();

    for task in plan.tasks() {
        let local_id = task.id.trim();
        let mut dependencies: Vec<TaskId> = Vec::with_capacity(task.dependencies.len());
        for reference in &task.dependencies {
            match resolved.get(reference.trim()) {
                Some(dependency) if !dependencies.contains(dependency) => {
                    dependencies.push(*dependency);
                }
                Some(_) => {}
                None => warn!(
                    task = local_id,
                    dependency = reference.as_str(),
                    "dropping unresolved dependency reference"
                ),
            }
        }

        let id = TaskId::new();
        resolved.insert(local_id, id);
        drafts.push(TaskDraft {
            id,
            title: task.title.clone(),
            objective: task.objective.clone(),
            role: task.role,
            dependencies,
            files: task.files.clone(),
            definition_of_done: task.definition_of_done.clone(),
            max_attempts,
        });
    }
    drafts
}
