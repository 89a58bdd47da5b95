//! Append-only task audit events.

use super::{ParseTaskEventKindError, TaskEventId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of transition an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// The task was created from the plan.
    Created,
    /// The task was handed to the execution agent.
    Started,
    /// The task succeeded.
    Completed,
    /// The task failed for good.
    Failed,
    /// The task failed an attempt and will be retried.
    Retrying,
    /// The owning job was paused while the task was unfinished.
    Paused,
}

impl TaskEventKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskEventKind {
    type Error = ParseTaskEventKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "retrying" => Ok(Self::Retrying),
            "paused" => Ok(Self::Paused),
            _ => Err(ParseTaskEventKindError(value.to_owned())),
        }
    }
}

/// Immutable audit record of a task transition.
///
/// Events are never consulted for control decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    id: TaskEventId,
    task_id: TaskId,
    kind: TaskEventKind,
    metadata: Value,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskEventData {
    /// Event identifier.
    pub id: TaskEventId,
    /// Task the event belongs to.
    pub task_id: TaskId,
    /// Event kind.
    pub kind: TaskEventKind,
    /// Free-form metadata payload.
    pub metadata: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Creates a new event for `task_id`.
    #[must_use]
    pub fn new(task_id: TaskId, kind: TaskEventKind, metadata: Value, clock: &impl Clock) -> Self {
        Self {
            id: TaskEventId::new(),
            task_id,
            kind,
            metadata,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs an event from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskEventData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            kind: data.kind,
            metadata: data.metadata,
            created_at: data.created_at,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> TaskEventId {
        self.id
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> TaskEventKind {
        self.kind
    }

    /// Returns the metadata payload.
    #[must_use]
    pub const fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
