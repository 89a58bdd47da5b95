//! Diesel row models for job orchestration persistence.

use super::schema::{conductor_jobs, conductor_run_leases, conductor_task_events, conductor_tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Row model for job records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = conductor_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    /// Job identifier.
    pub id: Uuid,
    /// Goal text.
    pub goal: String,
    /// Target repository reference.
    pub repository: String,
    /// Base integration branch.
    pub base_branch: String,
    /// Lifecycle status.
    pub status: String,
    /// Pull request URL.
    pub pull_request_url: Option<String>,
    /// Work branch.
    pub branch: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent failure cause.
    pub error_message: Option<String>,
}

/// Mutable job columns; `None` writes `NULL`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = conductor_jobs)]
#[diesel(treat_none_as_null = true)]
pub struct JobChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Pull request URL.
    pub pull_request_url: Option<String>,
    /// Work branch.
    pub branch: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent failure cause.
    pub error_message: Option<String>,
}

/// Row model for task records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = conductor_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: Uuid,
    /// Owning job.
    pub job_id: Uuid,
    /// Creation order within the job.
    pub position: i32,
    /// Short title.
    pub title: String,
    /// Objective text.
    pub objective: String,
    /// Assigned role.
    pub role: String,
    /// Lifecycle status.
    pub status: String,
    /// Dependency identifiers as a JSON array.
    pub dependencies: Value,
    /// File hints as a JSON array.
    pub files: Value,
    /// Completion criteria.
    pub definition_of_done: Option<String>,
    /// External run reference.
    pub run_id: Option<String>,
    /// Attempts consumed.
    pub attempt_count: i32,
    /// Attempts allowed.
    pub max_attempts: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent failure cause.
    pub error_message: Option<String>,
}

/// Mutable task columns; `None` writes `NULL`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = conductor_tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Lifecycle status.
    pub status: String,
    /// External run reference.
    pub run_id: Option<String>,
    /// Attempts consumed.
    pub attempt_count: i32,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal-status timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent failure cause.
    pub error_message: Option<String>,
}

/// Row model for task audit events.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = conductor_task_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskEventRow {
    /// Event identifier.
    pub id: Uuid,
    /// Task the event belongs to.
    pub task_id: Uuid,
    /// Event kind.
    pub event_type: String,
    /// Metadata payload.
    pub metadata: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for run leases.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conductor_run_leases)]
pub struct NewRunLeaseRow {
    /// Leased job.
    pub job_id: Uuid,
    /// Loop instance holding the lease.
    pub holder: Uuid,
    /// Claim timestamp.
    pub renewed_at: DateTime<Utc>,
}
