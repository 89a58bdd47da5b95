//! Request and response bodies.

use super::ApiError;
use crate::job::domain::{Job, JobStatus, Task, TaskEvent, TaskId, TaskStatus};
use crate::orchestration::services::SubmitJobRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Body of `POST /api/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitJobBody {
    /// Goal text.
    pub goal: Option<String>,
    /// Repository reference; `repo_url` is accepted as an alias.
    #[serde(alias = "repo_url")]
    pub repository: Option<String>,
    /// Base branch, `main` when omitted.
    pub base_branch: Option<String>,
    /// Free-text context handed to the planner.
    pub repository_context: Option<String>,
}

impl SubmitJobBody {
    /// Converts the body into a service request.
    ///
    /// # Errors
    ///
    /// Returns a 400 [`ApiError`] when the goal or repository is missing.
    pub fn into_request(self) -> Result<SubmitJobRequest, ApiError> {
        let (Some(goal), Some(repository)) = (self.goal, self.repository) else {
            return Err(ApiError::bad_request("goal and repository are required"));
        };
        let mut request = SubmitJobRequest::new(goal, repository);
        if let Some(base_branch) = self.base_branch {
            request = request.with_base_branch(base_branch);
        }
        if let Some(context) = self.repository_context {
            request = request.with_repository_context(context);
        }
        Ok(request)
    }
}

/// Query string of `GET /api/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    /// Optional status filter.
    pub status: Option<String>,
}

impl JobListQuery {
    /// Parses the status filter.
    ///
    /// # Errors
    ///
    /// Returns a 400 [`ApiError`] for an unknown status.
    pub fn status_filter(&self) -> Result<Option<JobStatus>, ApiError> {
        self.status
            .as_deref()
            .map(|raw| JobStatus::try_from(raw).map_err(|err| ApiError::bad_request(err.to_string())))
            .transpose()
    }
}

/// Optional body of `POST /api/jobs/:id/fail`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailJobBody {
    /// Failure message recorded on the job.
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /api/webhook/agent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWebhookBody {
    /// Task the update is about.
    pub task_id: Option<Uuid>,
    /// Run reported by the agent.
    pub run_id: Option<String>,
    /// `completed`, `failed`, or a progress status that is acknowledged only.
    pub status: Option<String>,
    /// Result payload for completed runs.
    pub result: Option<Value>,
    /// Failure description.
    pub error: Option<String>,
    /// Routes a failure through the retry path instead of failing the task.
    #[serde(default)]
    pub retryable: bool,
}

/// Single job envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    /// The job.
    pub job: Job,
}

/// Job listing envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JobListResponse {
    /// Jobs, newest first.
    pub jobs: Vec<Job>,
}

/// Task listing envelope.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    /// Tasks in creation order.
    pub tasks: Vec<Task>,
}

/// Event listing envelope.
#[derive(Debug, Clone, Serialize)]
pub struct EventListResponse {
    /// Events in append order.
    pub events: Vec<TaskEvent>,
}

/// Acknowledgement of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    /// Task the update was about.
    pub task_id: TaskId,
    /// What the engine did with the update.
    pub disposition: &'static str,
    /// Task status after the update, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}
