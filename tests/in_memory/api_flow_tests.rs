//! HTTP flows through the router over a real job service.

use super::helpers::{Harness, harness, plan, planned, wait_for_job, wait_for_task};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use conductor::api::{JobApi, router};
use conductor::job::domain::{JobId, JobStatus, TaskId, TaskRole, TaskStatus};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn app(ctx: &Harness) -> Router {
    let api: Arc<dyn JobApi> = ctx.service.clone();
    router(api)
}

async fn send(app: &Router, request: Request<Body>) -> eyre::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn post_json(uri: &str, body: &Value) -> eyre::Result<Request<Body>> {
    Ok(Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?)
}

fn get(uri: &str) -> eyre::Result<Request<Body>> {
    Ok(Request::get(uri).body(Body::empty())?)
}

fn json_str<'a>(value: &'a Value, pointer: &str) -> eyre::Result<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| eyre::eyre!("missing string at {pointer} in {value}"))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn webhook_drives_job_to_success() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("readme", TaskRole::Docs, &[])]));
    let app = app(&ctx);

    let (status, created) = send(
        &app,
        post_json(
            "/api/jobs",
            &json!({"goal": "Document the CLI", "repo_url": "acme/cli"}),
        )?,
    )
    .await?;
    eyre::ensure!(status == StatusCode::CREATED, "submit answered {status}");
    let job_id = JobId::from_uuid(json_str(&created, "/job/id")?.parse::<Uuid>()?);

    let (status, _) = send(&app, post_json(&format!("/api/jobs/{job_id}/run"), &json!({}))?).await?;
    eyre::ensure!(status == StatusCode::OK, "run answered {status}");

    let (_, listed) = send(&app, get(&format!("/api/jobs/{job_id}/tasks"))?).await?;
    let task_id = TaskId::from_uuid(json_str(&listed, "/tasks/0/id")?.parse::<Uuid>()?);
    let running = wait_for_task(&ctx.store, task_id, |task| {
        task.status() == TaskStatus::Running && task.run_id().is_some()
    })
    .await?;
    let run_id = running
        .run_id()
        .map(ToString::to_string)
        .ok_or_else(|| eyre::eyre!("no run id"))?;

    let (status, ack) = send(
        &app,
        post_json(
            "/api/webhook/agent",
            &json!({"taskId": task_id, "runId": run_id, "status": "completed"}),
        )?,
    )
    .await?;
    eyre::ensure!(status == StatusCode::OK, "webhook answered {status}");
    eyre::ensure!(json_str(&ack, "/disposition")? == "applied", "ack {ack}");

    wait_for_job(&ctx.store, job_id, JobStatus::Succeeded).await?;
    let (_, events) = send(&app, get(&format!("/api/tasks/{task_id}/events"))?).await?;
    let kinds: Vec<&str> = events
        .pointer("/events")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|event| event.get("kind").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    eyre::ensure!(kinds == ["created", "started", "completed"], "events {kinds:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn webhook_from_replaced_run_is_ignored() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("patch", TaskRole::Fixer, &[])]));
    let app = app(&ctx);
    let job = ctx
        .service
        .submit(conductor::orchestration::services::SubmitJobRequest::new(
            "Patch the parser",
            "acme/parser",
        ))
        .await?;
    let task_id = ctx
        .service
        .list_tasks(job.id())
        .await?
        .first()
        .map(|task| task.id())
        .ok_or_else(|| eyre::eyre!("no task"))?;
    ctx.service.start(job.id()).await?;
    wait_for_task(&ctx.store, task_id, |task| task.status() == TaskStatus::Running).await?;

    let (status, ack) = send(
        &app,
        post_json(
            "/api/webhook/agent",
            &json!({"taskId": task_id, "runId": "run-superseded", "status": "completed"}),
        )?,
    )
    .await?;

    eyre::ensure!(status == StatusCode::OK, "webhook answered {status}");
    eyre::ensure!(json_str(&ack, "/disposition")? == "stale", "ack {ack}");
    let task = ctx.service.get_task(task_id).await?;
    eyre::ensure!(task.status() == TaskStatus::Running, "stale signal changed the task");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pausing_a_pending_job_is_rejected() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("readme", TaskRole::Docs, &[])]));
    let app = app(&ctx);
    let (_, created) = send(
        &app,
        post_json("/api/jobs", &json!({"goal": "Docs", "repository": "acme/cli"}))?,
    )
    .await?;
    let job_id = json_str(&created, "/job/id")?.to_owned();

    let (status, body) = send(&app, post_json(&format!("/api/jobs/{job_id}/pause"), &json!({}))?).await?;

    eyre::ensure!(status == StatusCode::BAD_REQUEST, "pause answered {status}");
    eyre::ensure!(json_str(&body, "/code")? == "INVALID_STATE", "body {body}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operator_can_fail_a_job() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("readme", TaskRole::Docs, &[])]));
    let app = app(&ctx);
    let (_, created) = send(
        &app,
        post_json("/api/jobs", &json!({"goal": "Docs", "repository": "acme/cli"}))?,
    )
    .await?;
    let job_id = JobId::from_uuid(json_str(&created, "/job/id")?.parse::<Uuid>()?);

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/jobs/{job_id}/fail"),
            &json!({"message": "wrong repository"}),
        )?,
    )
    .await?;

    eyre::ensure!(status == StatusCode::OK, "fail answered {status}");
    eyre::ensure!(json_str(&body, "/job/status")? == "failed", "body {body}");
    wait_for_job(&ctx.store, job_id, JobStatus::Failed).await?;
    let (status, _) = send(&app, post_json(&format!("/api/jobs/{job_id}/fail"), &json!({}))?).await?;
    eyre::ensure!(status == StatusCode::BAD_REQUEST, "second fail answered {status}");
    Ok(())
}
