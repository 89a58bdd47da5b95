//! Domain model for jobs, tasks and task events.
//!
//! Lifecycle rules live on the status enums (`can_transition_to`) and are
//! enforced by the aggregate methods; persistence and orchestration stay
//! outside of the domain boundary.

mod branch;
mod error;
mod event;
mod ids;
mod job;
mod task;

pub use branch::BranchName;
pub use error::{
    JobDomainError, ParseJobStatusError, ParseTaskEventKindError, ParseTaskRoleError,
    ParseTaskStatusError,
};
pub use event::{PersistedTaskEventData, TaskEvent, TaskEventKind};
pub use ids::{JobId, LeaseHolder, RunId, TaskEventId, TaskId};
pub use job::{Job, JobStatus, PersistedJobData};
pub use task::{
    FailureDisposition, PersistedTaskData, Task, TaskDraft, TaskOutcome, TaskRole, TaskStatus,
};
