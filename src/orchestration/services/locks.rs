//! Keyed async locks serialising writes to the same task.

use crate::job::domain::TaskId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per task identifier.
///
/// The loop and the completion handler hold the lock for a task across
/// each read-modify-write cycle so that neither overwrites the other.
#[derive(Debug, Clone, Default)]
pub struct TaskLocks {
    slots: Arc<Mutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>>,
}

impl TaskLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `task_id`.
    pub async fn acquire(&self, task_id: TaskId) -> OwnedMutexGuard<()> {
        let slot = {
            // Slots are plain `Arc`s; a poisoned table is still consistent.
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(task_id).or_default())
        };
        slot.lock_owned().await
    }

    /// Drops the lock slot of a task that will never be written again.
    pub fn forget(&self, task_id: TaskId) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(&task_id);
    }
}
