//! Results reported by the engine's operations.

use crate::job::domain::{JobStatus, TaskId, TaskStatus};

/// Reason the orchestration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The job is in a terminal status.
    Finished(JobStatus),
    /// The job left `running` without finishing, for example by a pause.
    Suspended(JobStatus),
    /// The job no longer exists.
    JobMissing,
    /// Another loop took over the job's expired run lease.
    LeaseLost,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The job is still running; tick again after the poll interval.
    Continue,
    /// The loop must stop.
    Stop(LoopExit),
}

/// What a completion signal did to its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    /// The task moved to the given terminal status.
    Applied(TaskStatus),
    /// The task was already terminal; nothing changed.
    Duplicate,
    /// The signal names a run other than the task's latest; nothing changed.
    Stale,
}

/// Tasks handled by one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Tasks handed to the agent, in launch order.
    pub launched: Vec<TaskId>,
    /// Tasks whose launch failed and went through the failure path.
    pub failed: Vec<TaskId>,
}
