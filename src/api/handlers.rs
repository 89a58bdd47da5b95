//! Route table and request handlers.

use super::{
    AgentWebhookBody, ApiError, ApiResult, EventListResponse, FailJobBody, JobApi, JobListQuery,
    JobListResponse, JobResponse, SubmitJobBody, TaskListResponse, WebhookAck,
};
use crate::job::domain::{FailureDisposition, JobId, RunId, TaskId, TaskOutcome, TaskStatus};
use crate::orchestration::domain::{CompletionSignal, SignalDisposition};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

type SharedApi = Arc<dyn JobApi>;

const REPORTED_FAILURE: &str = "agent reported a failure";
const OPERATOR_FAILURE: &str = "failed by operator";

/// Builds the router serving every job endpoint.
#[must_use]
pub fn router(api: SharedApi) -> Router {
    Router::new()
        .route("/api/jobs", post(submit_job).get(list_jobs))
        .route("/api/jobs/:id", get(get_job))
        .route("/api/jobs/:id/tasks", get(list_tasks))
        .route("/api/jobs/:id/run", post(start_job))
        .route("/api/jobs/:id/pause", post(pause_job))
        .route("/api/jobs/:id/resume", post(resume_job))
        .route("/api/jobs/:id/fail", post(fail_job))
        .route("/api/tasks/:id/events", get(list_events))
        .route("/api/webhook/agent", post(agent_webhook))
        .with_state(api)
}

async fn submit_job(
    State(api): State<SharedApi>,
    Json(body): Json<SubmitJobBody>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    let job = api.submit(body.into_request()?).await?;
    Ok((StatusCode::CREATED, Json(JobResponse { job })))
}

async fn list_jobs(
    State(api): State<SharedApi>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<Json<JobListResponse>> {
    let jobs = api.list_jobs(query.status_filter()?).await?;
    Ok(Json(JobListResponse { jobs }))
}

async fn get_job(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    let job = api.get_job(JobId::from_uuid(id)).await?;
    Ok(Json(JobResponse { job }))
}

async fn list_tasks(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = api.list_tasks(JobId::from_uuid(id)).await?;
    Ok(Json(TaskListResponse { tasks }))
}

async fn start_job(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    let job = api.start(JobId::from_uuid(id)).await?;
    Ok(Json(JobResponse { job }))
}

async fn pause_job(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    let job = api.pause(JobId::from_uuid(id)).await?;
    Ok(Json(JobResponse { job }))
}

async fn resume_job(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    let job = api.resume(JobId::from_uuid(id)).await?;
    Ok(Json(JobResponse { job }))
}

async fn fail_job(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
    body: Option<Json<FailJobBody>>,
) -> ApiResult<Json<JobResponse>> {
    let message = body
        .and_then(|Json(payload)| payload.message)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| OPERATOR_FAILURE.to_owned());
    let job = api.fail(JobId::from_uuid(id), message).await?;
    Ok(Json(JobResponse { job }))
}

async fn list_events(
    State(api): State<SharedApi>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EventListResponse>> {
    let events = api.list_events(TaskId::from_uuid(id)).await?;
    Ok(Json(EventListResponse { events }))
}

async fn agent_webhook(
    State(api): State<SharedApi>,
    Json(body): Json<AgentWebhookBody>,
) -> ApiResult<Json<WebhookAck>> {
    let (Some(task_uuid), Some(raw_run_id)) = (body.task_id, body.run_id.clone()) else {
        return Err(ApiError::bad_request("taskId and runId are required"));
    };
    let task_id = TaskId::from_uuid(task_uuid);
    let run_id = RunId::new(raw_run_id).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let status = body
        .status
        .as_deref()
        .map(|raw| raw.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let ack = match (status.as_str(), body.retryable) {
        ("completed", _) => {
            let signal = outcome_signal(task_id, run_id, TaskOutcome::Completed, &body);
            signal_ack(task_id, api.report_outcome(signal).await?)
        }
        ("failed", false) => {
            let signal = outcome_signal(task_id, run_id, TaskOutcome::Failed, &body);
            signal_ack(task_id, api.report_outcome(signal).await?)
        }
        ("failed", true) => {
            let error = body.error.unwrap_or_else(|| REPORTED_FAILURE.to_owned());
            let disposition = api
                .report_attempt_failure(task_id, Some(run_id), error)
                .await?;
            failure_ack(task_id, disposition)
        }
        _ => {
            api.get_task(task_id).await?;
            WebhookAck {
                task_id,
                disposition: "ignored",
                status: None,
            }
        }
    };
    info!(%task_id, disposition = ack.disposition, "agent webhook processed");
    Ok(Json(ack))
}

fn outcome_signal(
    task_id: TaskId,
    run_id: RunId,
    outcome: TaskOutcome,
    body: &AgentWebhookBody,
) -> CompletionSignal {
    let mut signal = CompletionSignal::new(task_id, outcome).with_run_id(run_id);
    if let Some(result) = &body.result {
        signal = signal.with_result(result.clone());
    }
    if let Some(error) = &body.error {
        signal = signal.with_error(error.clone());
    }
    signal
}

const fn signal_ack(task_id: TaskId, disposition: SignalDisposition) -> WebhookAck {
    let (label, status) = match disposition {
        SignalDisposition::Applied(status) => ("applied", Some(status)),
        SignalDisposition::Duplicate => ("duplicate", None),
        SignalDisposition::Stale => ("stale", None),
    };
    WebhookAck {
        task_id,
        disposition: label,
        status,
    }
}

const fn failure_ack(task_id: TaskId, disposition: Option<FailureDisposition>) -> WebhookAck {
    let (label, status) = match disposition {
        Some(FailureDisposition::Retrying { .. }) => ("retrying", None),
        Some(FailureDisposition::Exhausted { .. }) => ("exhausted", Some(TaskStatus::Failed)),
        None => ("ignored", None),
    };
    WebhookAck {
        task_id,
        disposition: label,
        status,
    }
}
