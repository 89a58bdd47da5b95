//! Handler tests against a mocked job facade.

use crate::api::{facade::MockJobApi, router};
use crate::job::domain::{
    BranchName, FailureDisposition, Job, JobId, JobStatus, RunId, TaskId, TaskOutcome,
    TaskStatus,
};
use crate::orchestration::{domain::SignalDisposition, services::JobServiceError};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use mockable::DefaultClock;
use mockall::predicate::eq;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn sample_job() -> Job {
    Job::new("Add login", "acme/web", BranchName::main(), &DefaultClock).expect("valid job")
}

fn app(api: MockJobApi) -> Router {
    router(Arc::new(api))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submit_returns_created_job() {
    let job = sample_job();
    let returned = job.clone();
    let mut api = MockJobApi::new();
    api.expect_submit()
        .times(1)
        .returning(move |_| Ok(returned.clone()));

    let (status, body) = send(
        app(api),
        post_json(
            "/api/jobs",
            &json!({ "goal": "Add login", "repo_url": "acme/web" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["job"]["id"], json!(job.id()));
    assert_eq!(body["job"]["status"], json!("planning"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submit_requires_goal_and_repository() {
    let (status, body) = send(
        app(MockJobApi::new()),
        post_json("/api/jobs", &json!({ "goal": "Add login" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("BAD_REQUEST"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_jobs_passes_status_filter() {
    let mut api = MockJobApi::new();
    api.expect_list_jobs()
        .with(eq(Some(JobStatus::Running)))
        .times(1)
        .returning(|_| Ok(Vec::new()));

    let (status, body) = send(app(api), get("/api/jobs?status=running")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "jobs": [] }));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_jobs_rejects_unknown_status() {
    let (status, _) = send(app(MockJobApi::new()), get("/api/jobs?status=sleeping")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_job_is_not_found() {
    let job_id = JobId::new();
    let mut api = MockJobApi::new();
    api.expect_get_job()
        .with(eq(job_id))
        .returning(|id| Err(JobServiceError::JobNotFound(id)));

    let (status, body) = send(app(api), get(&format!("/api/jobs/{job_id}"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("NOT_FOUND"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn starting_a_running_job_is_a_client_error() {
    let job_id = JobId::new();
    let mut api = MockJobApi::new();
    api.expect_start().returning(|id| {
        Err(JobServiceError::InvalidState {
            job_id: id,
            status: JobStatus::Running,
            operation: "start",
        })
    });

    let (status, body) = send(
        app(api),
        post_json(&format!("/api/jobs/{job_id}/run"), &Value::Null),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INVALID_STATE"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn webhook_requires_task_and_run() {
    let (status, _) = send(
        app(MockJobApi::new()),
        post_json(
            "/api/webhook/agent",
            &json!({ "taskId": TaskId::new(), "status": "completed" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn webhook_applies_completion() {
    let task_id = TaskId::new();
    let mut api = MockJobApi::new();
    api.expect_report_outcome()
        .withf(move |signal| {
            signal.task_id() == task_id
                && signal.outcome() == TaskOutcome::Completed
                && signal.run_id().map(RunId::as_str) == Some("run-1")
        })
        .times(1)
        .returning(|_| Ok(SignalDisposition::Applied(TaskStatus::Succeeded)));

    let (status, body) = send(
        app(api),
        post_json(
            "/api/webhook/agent",
            &json!({ "taskId": task_id, "runId": "run-1", "status": "completed" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disposition"], json!("applied"));
    assert_eq!(body["status"], json!("succeeded"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retryable_failure_uses_retry_path() {
    let task_id = TaskId::new();
    let mut api = MockJobApi::new();
    api.expect_report_attempt_failure()
        .withf(move |id, run, error| {
            *id == task_id && run.is_some() && error == "timeout"
        })
        .times(1)
        .returning(|_, _, _| Ok(Some(FailureDisposition::Retrying { attempt: 1 })));

    let (status, body) = send(
        app(api),
        post_json(
            "/api/webhook/agent",
            &json!({
                "taskId": task_id,
                "runId": "run-1",
                "status": "failed",
                "error": "timeout",
                "retryable": true,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disposition"], json!("retrying"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn progress_updates_are_acknowledged() {
    let task_id = TaskId::new();
    let mut api = MockJobApi::new();
    api.expect_get_task()
        .with(eq(task_id))
        .times(1)
        .returning(|id| Err(JobServiceError::TaskNotFound(id)));

    let (status, _) = send(
        app(api),
        post_json(
            "/api/webhook/agent",
            &json!({ "taskId": task_id, "runId": "run-1", "status": "running" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn webhook_failure_keeps_error_and_result() {
    let task_id = TaskId::new();
    let mut api = MockJobApi::new();
    api.expect_report_outcome()
        .withf(move |signal| {
            signal.task_id() == task_id
                && signal.outcome() == TaskOutcome::Failed
                && signal.run_id().map(RunId::as_str) == Some("run-2")
                && signal.error() == Some("tests broke")
                && signal.result() == Some(&json!({ "log": "3 failures" }))
        })
        .times(1)
        .returning(|_| Ok(SignalDisposition::Applied(TaskStatus::Failed)));

    let (status, body) = send(
        app(api),
        post_json(
            "/api/webhook/agent",
            &json!({
                "taskId": task_id,
                "runId": "run-2",
                "status": "failed",
                "error": "tests broke",
                "result": { "log": "3 failures" },
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("failed"));
}

#[rstest]
#[case::with_message(json!({ "message": "wrong repository" }), "wrong repository")]
#[case::without_message(Value::Null, "failed by operator")]
#[case::blank_message(json!({ "message": "  " }), "failed by operator")]
#[tokio::test(flavor = "multi_thread")]
async fn fail_route_marks_job_failed(#[case] request: Value, #[case] expected: &'static str) {
    let job_id = JobId::new();
    let mut failed = sample_job();
    failed
        .fail(expected, &DefaultClock)
        .expect("planning job can fail");
    let mut api = MockJobApi::new();
    api.expect_fail()
        .withf(move |id, message| *id == job_id && message == expected)
        .times(1)
        .returning(move |_, _| Ok(failed.clone()));

    let (status, body) = send(
        app(api),
        post_json(&format!("/api/jobs/{job_id}/fail"), &request),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["status"], json!("failed"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_a_finished_job_is_a_client_error() {
    let job_id = JobId::new();
    let mut api = MockJobApi::new();
    api.expect_fail().returning(|id, _| {
        Err(JobServiceError::InvalidState {
            job_id: id,
            status: JobStatus::Succeeded,
            operation: "fail",
        })
    });

    let (status, body) = send(
        app(api),
        post_json(&format!("/api/jobs/{job_id}/fail"), &Value::Null),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INVALID_STATE"));
}
