//! Task aggregate, role and lifecycle types.

use super::{JobDomainError, JobId, ParseTaskRoleError, ParseTaskStatusError, RunId, TaskId};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Failure cause recorded when the agent reports a failure without detail.
const REPORTED_FAILURE_MESSAGE: &str = "execution agent reported failure";

/// Kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRole {
    /// Structures further work without changing code.
    #[serde(alias = "PLANNER")]
    Planner,
    /// Implements code changes.
    #[serde(alias = "CODER")]
    Coder,
    /// Writes and runs tests.
    #[serde(alias = "TESTER")]
    Tester,
    /// Reviews changes produced by other tasks.
    #[serde(alias = "REVIEWER")]
    Reviewer,
    /// Writes documentation.
    #[serde(alias = "DOCS")]
    Docs,
    /// Fixes issues found by earlier tasks.
    #[serde(alias = "FIXER")]
    Fixer,
}

impl TaskRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Planner,
        Self::Coder,
        Self::Tester,
        Self::Reviewer,
        Self::Docs,
        Self::Fixer,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Coder => "coder",
            Self::Tester => "tester",
            Self::Reviewer => "reviewer",
            Self::Docs => "docs",
            Self::Fixer => "fixer",
        }
    }
}

impl fmt::Display for TaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskRole {
    type Error = ParseTaskRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ParseTaskRoleError(value.to_owned()))
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for dependencies.
    Pending,
    /// Dependencies satisfied; eligible for dispatch.
    Ready,
    /// Handed to the execution agent.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed,
    /// Failed an attempt and is waiting to return to `pending`.
    Retrying,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    /// Returns `true` for statuses that end the task lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns `true` when the lifecycle permits moving to `target`.
    ///
    /// Terminal statuses are reachable from any non-terminal status so that
    /// an authoritative external outcome can always be recorded.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match target {
            Self::Succeeded | Self::Failed => true,
            Self::Ready => matches!(self, Self::Pending),
            Self::Running => matches!(self, Self::Ready),
            Self::Retrying => matches!(self, Self::Running),
            Self::Pending => matches!(self, Self::Retrying),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "retrying" => Ok(Self::Retrying),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Definitive outcome reported by the execution agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The agent finished the task.
    Completed,
    /// The agent gave up on the task.
    Failed,
}

impl TaskOutcome {
    /// Returns the terminal task status for this outcome.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        match self {
            Self::Completed => TaskStatus::Succeeded,
            Self::Failed => TaskStatus::Failed,
        }
    }
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Attempts remain; the task is now `retrying`.
    Retrying {
        /// Attempts consumed so far.
        attempt: u32,
    },
    /// The last attempt was consumed; the task is now `failed`.
    Exhausted {
        /// Attempts consumed so far, equal to the maximum.
        attempt: u32,
    },
}

/// Planner-derived fields for a task about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Globally unique identifier assigned during plan remapping.
    pub id: TaskId,
    /// Short title.
    pub title: String,
    /// Objective text.
    pub objective: String,
    /// Assigned role.
    pub role: TaskRole,
    /// Tasks that must succeed first.
    pub dependencies: Vec<TaskId>,
    /// File or area hints.
    pub files: Vec<String>,
    /// Completion criteria.
    pub definition_of_done: Option<String>,
    /// Attempts allowed before the task fails for good.
    pub max_attempts: u32,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    job_id: JobId,
    position: u32,
    title: String,
    objective: String,
    role: TaskRole,
    status: TaskStatus,
    dependencies: Vec<TaskId>,
    files: Vec<String>,
    definition_of_done: Option<String>,
    run_id: Option<RunId>,
    attempt_count: u32,
    max_attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Task identifier.
    pub id: TaskId,
    /// Owning job.
    pub job_id: JobId,
    /// Creation order within the job.
    pub position: u32,
    /// Short title.
    pub title: String,
    /// Objective text.
    pub objective: String,
    /// Assigned role.
    pub role: TaskRole,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Dependency task identifiers.
    pub dependencies: Vec<TaskId>,
    /// File or area hints.
    pub files: Vec<String>,
    /// Completion criteria.
    pub definition_of_done: Option<String>,
    /// External run reference.
    pub run_id: Option<RunId>,
    /// Attempts consumed.
    pub attempt_count: u32,
    /// Attempts allowed.
    pub max_attempts: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent failure cause.
    pub error_message: Option<String>,
}

impl Task {
    /// Creates a `pending` task owned by `job_id` at creation `position`.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::EmptyTaskTitle`] for a blank title or
    /// [`JobDomainError::InvalidMaxAttempts`] when no attempt is allowed.
    pub fn new(
        job_id: JobId,
        position: u32,
        draft: TaskDraft,
        clock: &impl Clock,
    ) -> Result<Self, JobDomainError> {
        let TaskDraft {
            id,
            title,
            objective,
            role,
            dependencies,
            files,
            definition_of_done,
            max_attempts,
        } = draft;

        if title.trim().is_empty() {
            return Err(JobDomainError::EmptyTaskTitle);
        }
        if max_attempts == 0 {
            return Err(JobDomainError::InvalidMaxAttempts(max_attempts));
        }

        let timestamp = clock.utc();
        Ok(Self {
            id,
            job_id,
            position,
            title: title.trim().to_owned(),
            objective,
            role,
            status: TaskStatus::Pending,
            dependencies,
            files,
            definition_of_done,
            run_id: None,
            attempt_count: 0,
            max_attempts,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
            error_message: None,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            job_id: data.job_id,
            position: data.position,
            title: data.title,
            objective: data.objective,
            role: data.role,
            status: data.status,
            dependencies: data.dependencies,
            files: data.files,
            definition_of_done: data.definition_of_done,
            run_id: data.run_id,
            attempt_count: data.attempt_count,
            max_attempts: data.max_attempts,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
            error_message: data.error_message,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning job identifier.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the creation order within the job.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the objective.
    #[must_use]
    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Returns the assigned role.
    #[must_use]
    pub const fn role(&self) -> TaskRole {
        self.role
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the dependency task identifiers.
    #[must_use]
    pub fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }

    /// Returns the file or area hints.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Returns the definition of done, if any.
    #[must_use]
    pub fn definition_of_done(&self) -> Option<&str> {
        self.definition_of_done.as_deref()
    }

    /// Returns the external run reference of the latest launch.
    #[must_use]
    pub const fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Returns the attempts consumed so far.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Returns the attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the timestamp at which the task reached a terminal status.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the most recent failure cause.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Moves the task to `target`.
    ///
    /// Entering a terminal status stamps `completed_at`; entering
    /// `succeeded` clears any earlier error message. Entering `running`
    /// clears the previous attempt's run reference.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTaskTransition`] when the lifecycle
    /// forbids the move.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(JobDomainError::InvalidTaskTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }

        let timestamp = clock.utc();
        self.status = target;
        self.updated_at = timestamp;
        if target.is_terminal() {
            self.completed_at = Some(timestamp);
        }
        if target == TaskStatus::Succeeded {
            self.error_message = None;
        }
        if target == TaskStatus::Running {
            self.run_id = None;
        }
        Ok(())
    }

    /// Returns `true` when the task is `retrying` and `delay` has passed
    /// since it entered that status.
    #[must_use]
    pub fn retry_due(&self, delay: Duration, now: DateTime<Utc>) -> bool {
        if self.status != TaskStatus::Retrying {
            return false;
        }
        let wait = TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX);
        self.updated_at
            .checked_add_signed(wait)
            .is_some_and(|due| due <= now)
    }

    /// Returns `true` for a `running` task that never received a run
    /// reference from the agent.
    #[must_use]
    pub const fn is_unlaunched(&self) -> bool {
        matches!(self.status, TaskStatus::Running) && self.run_id.is_none()
    }

    /// Hands an unlaunched `running` task back to `ready`.
    ///
    /// Used when dispatch stopped between the `running` write and the
    /// agent's acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTaskTransition`] unless the task is
    /// `running` without a run reference.
    pub fn requeue_unlaunched(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        if !self.is_unlaunched() {
            return Err(JobDomainError::InvalidTaskTransition {
                task_id: self.id,
                from: self.status,
                to: TaskStatus::Ready,
            });
        }
        self.status = TaskStatus::Ready;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Records the run reference issued by the execution agent.
    pub fn record_run(&mut self, run_id: RunId, clock: &impl Clock) {
        self.run_id = Some(run_id);
        self.updated_at = clock.utc();
    }

    /// Consumes one attempt of a `running` task after a failure.
    ///
    /// The task becomes `failed` once the attempt count reaches the maximum
    /// and `retrying` otherwise. The attempt count never exceeds the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTaskTransition`] when the task is not
    /// `running`.
    pub fn record_failed_attempt(
        &mut self,
        error: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<FailureDisposition, JobDomainError> {
        let attempt = self.attempt_count.saturating_add(1).min(self.max_attempts);
        let target = if attempt >= self.max_attempts {
            TaskStatus::Failed
        } else {
            TaskStatus::Retrying
        };
        if self.status != TaskStatus::Running {
            return Err(JobDomainError::InvalidTaskTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }

        self.transition_to(target, clock)?;
        self.attempt_count = attempt;
        self.error_message = Some(error.into());

        Ok(if target == TaskStatus::Failed {
            FailureDisposition::Exhausted { attempt }
        } else {
            FailureDisposition::Retrying { attempt }
        })
    }

    /// Records a definitive outcome reported by the execution agent.
    ///
    /// Does not consume an attempt.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTaskTransition`] when the task is
    /// already terminal.
    pub fn complete(
        &mut self,
        outcome: TaskOutcome,
        error: Option<String>,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.transition_to(outcome.status(), clock)?;
        if outcome == TaskOutcome::Failed {
            self.error_message =
                Some(error.unwrap_or_else(|| REPORTED_FAILURE_MESSAGE.to_owned()));
        }
        Ok(())
    }
}
