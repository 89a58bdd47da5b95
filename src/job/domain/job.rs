//! Job aggregate root and its lifecycle status.

use super::{BranchName, JobDomainError, JobId, ParseJobStatusError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Tasks are persisted and the job awaits a start trigger.
    Pending,
    /// The planner is decomposing the goal.
    Planning,
    /// The orchestration loop is advancing the job.
    Running,
    /// Administratively suspended; the loop does not advance it.
    Paused,
    /// Every task succeeded.
    Succeeded,
    /// At least one task failed, or an operator failed the job.
    Failed,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planning => "planning",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for statuses that end the job lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns `true` when the lifecycle permits moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Planning => matches!(target, Self::Pending | Self::Failed),
            Self::Pending => matches!(target, Self::Running | Self::Failed),
            Self::Running => matches!(target, Self::Paused | Self::Succeeded | Self::Failed),
            Self::Paused => matches!(target, Self::Running | Self::Failed),
            Self::Succeeded | Self::Failed => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "planning" => Ok(Self::Planning),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseJobStatusError(value.to_owned())),
        }
    }
}

/// Job aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    goal: String,
    repository: String,
    base_branch: BranchName,
    status: JobStatus,
    pull_request_url: Option<String>,
    branch: Option<BranchName>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

/// Parameter object for reconstructing a persisted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedJobData {
    /// Persisted job identifier.
    pub id: JobId,
    /// Goal text.
    pub goal: String,
    /// Target repository reference.
    pub repository: String,
    /// Base integration branch.
    pub base_branch: BranchName,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Pull request URL, if one was opened.
    pub pull_request_url: Option<String>,
    /// Work branch, if one was created.
    pub branch: Option<BranchName>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent failure cause.
    pub error_message: Option<String>,
}

impl Job {
    /// Creates a job in the `planning` status.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::EmptyGoal`] for a blank goal or
    /// [`JobDomainError::InvalidRepository`] when the repository reference is
    /// blank or contains whitespace.
    pub fn new(
        goal: impl Into<String>,
        repository: impl Into<String>,
        base_branch: BranchName,
        clock: &impl Clock,
    ) -> Result<Self, JobDomainError> {
        let goal_text = goal.into();
        if goal_text.trim().is_empty() {
            return Err(JobDomainError::EmptyGoal);
        }

        let raw_repository = repository.into();
        let repository_ref = raw_repository.trim();
        if repository_ref.is_empty() || repository_ref.chars().any(char::is_whitespace) {
            return Err(JobDomainError::InvalidRepository(raw_repository));
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: JobId::new(),
            goal: goal_text.trim().to_owned(),
            repository: repository_ref.to_owned(),
            base_branch,
            status: JobStatus::Planning,
            pull_request_url: None,
            branch: None,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
            error_message: None,
        })
    }

    /// Reconstructs a job from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedJobData) -> Self {
        Self {
            id: data.id,
            goal: data.goal,
            repository: data.repository,
            base_branch: data.base_branch,
            status: data.status,
            pull_request_url: data.pull_request_url,
            branch: data.branch,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
            error_message: data.error_message,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the goal text.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Returns the target repository reference.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the base integration branch.
    #[must_use]
    pub const fn base_branch(&self) -> &BranchName {
        &self.base_branch
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the pull request URL, if any.
    #[must_use]
    pub fn pull_request_url(&self) -> Option<&str> {
        self.pull_request_url.as_deref()
    }

    /// Returns the work branch, if any.
    #[must_use]
    pub const fn branch(&self) -> Option<&BranchName> {
        self.branch.as_ref()
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

    /// Returns the timestamp at which the job reached a terminal status.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the most recent failure cause.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Moves the job to `target`.
    ///
    /// Entering a terminal status stamps `completed_at`; entering
    /// `succeeded` clears any earlier error message.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidJobTransition`] when the lifecycle
    /// forbids the move.
    pub fn transition_to(
        &mut self,
        target: JobStatus,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(JobDomainError::InvalidJobTransition {
                job_id: self.id,
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
        if target == JobStatus::Succeeded {
            self.error_message = None;
        }
        Ok(())
    }

    /// Moves the job to `failed`, recording `message` as the failure cause.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidJobTransition`] when the job is
    /// already terminal.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.transition_to(JobStatus::Failed, clock)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Records the work branch created for this job.
    pub fn record_branch(&mut self, branch: BranchName, clock: &impl Clock) {
        self.branch = Some(branch);
        self.updated_at = clock.utc();
    }

    /// Records the pull request opened for this job.
    pub fn record_pull_request(&mut self, url: impl Into<String>, clock: &impl Clock) {
        self.pull_request_url = Some(url.into());
        self.updated_at = clock.utc();
    }
}
