//! Fields handed to the execution agent for one task.

use crate::job::domain::{JobId, Task, TaskId, TaskRole};
use serde::Serialize;

/// Everything an execution agent needs to perform a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchRequest {
    task_id: TaskId,
    job_id: JobId,
    title: String,
    objective: String,
    role: TaskRole,
    files: Vec<String>,
    definition_of_done: Option<String>,
}

impl LaunchRequest {
    /// Builds the launch request for `task`.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            job_id: task.job_id(),
            title: task.title().to_owned(),
            objective: task.objective().to_owned(),
            role: task.role(),
            files: task.files().to_vec(),
            definition_of_done: task.definition_of_done().map(str::to_owned),
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the owning job identifier.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the objective text.
    #[must_use]
    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Returns the assigned role.
    #[must_use]
    pub const fn role(&self) -> TaskRole {
        self.role
    }

    /// Returns the file hints.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Returns the definition of done, if any.
    #[must_use]
    pub fn definition_of_done(&self) -> Option<&str> {
        self.definition_of_done.as_deref()
    }
}
