//! Dependency readiness evaluation.

use crate::job::domain::{Task, TaskId, TaskStatus};
use std::collections::BTreeSet;

/// Returns the `pending` tasks whose dependencies have all succeeded.
///
/// Tasks without dependencies are always eligible. A dependency naming a
/// task outside `tasks` is never satisfied.
#[must_use]
pub fn compute_ready(tasks: &[Task]) -> BTreeSet<TaskId> {
    let succeeded: BTreeSet<TaskId> = tasks
        .iter()
        .filter(|task| task.status() == TaskStatus::Succeeded)
        .map(Task::id)
        .collect();

    tasks
        .iter()
        .filter(|task| task.status() == TaskStatus::Pending)
        .filter(|task| {
            task.dependencies()
                .iter()
                .all(|dependency| succeeded.contains(dependency))
        })
        .map(Task::id)
        .collect()
}
