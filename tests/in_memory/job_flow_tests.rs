//! End-to-end job flows over in-memory adapters.

use super::helpers::{harness, plan, planned, wait_for_job, wait_for_task};
use conductor::job::{
    domain::{JobStatus, TaskEventKind, TaskOutcome, TaskRole, TaskStatus},
    ports::JobStore,
};
use conductor::orchestration::{
    domain::{CompletionSignal, LoopExit},
    services::SubmitJobRequest,
};
use mockable::DefaultClock;
use rstest::rstest;
use std::time::Duration;

fn request() -> SubmitJobRequest {
    SubmitJobRequest::new("Add password reset", "acme/web").with_base_branch("develop")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn job_runs_through_dependency_chain() -> eyre::Result<()> {
    let ctx = harness(plan(vec![
        planned("schema", TaskRole::Coder, &[]),
        planned("endpoint", TaskRole::Coder, &["schema"]),
        planned("tests", TaskRole::Tester, &["endpoint"]),
    ]));
    let job = ctx.service.submit(request()).await?;
    eyre::ensure!(job.base_branch().as_str() == "develop", "base branch kept");
    let tasks = ctx.service.list_tasks(job.id()).await?;
    let (_, handle) = ctx.service.start(job.id()).await?.into_parts();

    for task in &tasks {
        let launched = wait_for_task(&ctx.store, task.id(), |current| {
            current.status() == TaskStatus::Running && current.run_id().is_some()
        })
        .await?;
        let signal = CompletionSignal::new(task.id(), TaskOutcome::Completed)
            .with_run_id(launched.run_id().cloned().ok_or_else(|| eyre::eyre!("no run"))?);
        ctx.service.report_outcome(&signal).await?;
    }

    let exit = tokio::time::timeout(Duration::from_secs(5), handle).await???;
    eyre::ensure!(exit == LoopExit::Finished(JobStatus::Succeeded), "exit {exit:?}");
    let launches = ctx.agent.launches()?;
    let order: Vec<_> = launches.iter().map(|launch| launch.task_id()).collect();
    let expected: Vec<_> = tasks.iter().map(|task| task.id()).collect();
    eyre::ensure!(order == expected, "tasks launched out of dependency order");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn launch_failures_are_retried() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("docs", TaskRole::Docs, &[])]));
    let job = ctx.service.submit(request()).await?;
    let task_id = ctx
        .service
        .list_tasks(job.id())
        .await?
        .first()
        .map(|task| task.id())
        .ok_or_else(|| eyre::eyre!("plan produced no task"))?;
    ctx.agent.fail_next_launches(task_id, 2)?;

    ctx.service.start(job.id()).await?;
    let launched = wait_for_task(&ctx.store, task_id, |task| {
        task.status() == TaskStatus::Running && task.run_id().is_some()
    })
    .await?;

    eyre::ensure!(launched.attempt_count() == 2, "two failed launches consumed");
    eyre::ensure!(ctx.agent.launch_count(task_id)? == 3, "third launch succeeded");
    let kinds: Vec<TaskEventKind> = ctx
        .service
        .list_events(task_id)
        .await?
        .iter()
        .map(|event| event.kind())
        .collect();
    eyre::ensure!(
        kinds
            == vec![
                TaskEventKind::Created,
                TaskEventKind::Started,
                TaskEventKind::Retrying,
                TaskEventKind::Started,
                TaskEventKind::Retrying,
                TaskEventKind::Started,
            ],
        "unexpected events {kinds:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_agent_exhausts_attempts_and_fails_job() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("fix", TaskRole::Fixer, &[])]));
    ctx.agent.reject_all_launches()?;
    let job = ctx.service.submit(request()).await?;

    ctx.service.start(job.id()).await?;
    wait_for_job(&ctx.store, job.id(), JobStatus::Failed).await?;

    let stored = ctx.service.get_job(job.id()).await?;
    eyre::ensure!(
        stored.error_message() == Some("1 of 1 tasks failed"),
        "job error {:?}",
        stored.error_message()
    );
    let task = ctx
        .service
        .list_tasks(job.id())
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| eyre::eyre!("task missing"))?;
    eyre::ensure!(task.attempt_count() == task.max_attempts(), "attempts exhausted");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn paused_job_resumes_where_it_left_off() -> eyre::Result<()> {
    let ctx = harness(plan(vec![
        planned("first", TaskRole::Coder, &[]),
        planned("second", TaskRole::Reviewer, &["first"]),
    ]));
    let job = ctx.service.submit(request()).await?;
    let tasks = ctx.service.list_tasks(job.id()).await?;
    let [first, second] = tasks.as_slice() else {
        eyre::bail!("expected two tasks");
    };
    let (_, handle) = ctx.service.start(job.id()).await?.into_parts();
    wait_for_task(&ctx.store, first.id(), |task| task.status() == TaskStatus::Running).await?;

    ctx.service.pause(job.id()).await?;
    let exit = tokio::time::timeout(Duration::from_secs(5), handle).await???;
    eyre::ensure!(exit == LoopExit::Suspended(JobStatus::Paused), "exit {exit:?}");

    ctx.service
        .report_outcome(&CompletionSignal::new(first.id(), TaskOutcome::Completed))
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let waiting = ctx
        .service
        .get_task(second.id())
        .await?
        .status();
    eyre::ensure!(waiting == TaskStatus::Pending, "paused job must not dispatch");

    ctx.service.resume(job.id()).await?;
    wait_for_task(&ctx.store, second.id(), |task| task.status() == TaskStatus::Running).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn jobs_are_listed_newest_first() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("docs", TaskRole::Docs, &[])]));
    let older = ctx.service.submit(request()).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newer = ctx.service.submit(request()).await?;

    let listed: Vec<_> = ctx
        .service
        .list_jobs(None)
        .await?
        .iter()
        .map(|job| job.id())
        .collect();

    eyre::ensure!(listed == vec![newer.id(), older.id()], "order {listed:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn running_job_without_a_loop_is_recovered() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("docs", TaskRole::Docs, &[])]));
    let submitted = ctx.service.submit(request()).await?;
    let mut orphaned = ctx.service.get_job(submitted.id()).await?;
    orphaned.transition_to(JobStatus::Running, &DefaultClock)?;
    ctx.store.update_job(&orphaned).await?;
    let tasks = ctx.service.list_tasks(orphaned.id()).await?;
    let task = tasks.first().ok_or_else(|| eyre::eyre!("no task"))?;

    let recovered = ctx.service.recover_running().await?;

    eyre::ensure!(recovered.len() == 1, "recovered {}", recovered.len());
    wait_for_task(&ctx.store, task.id(), |current| {
        current.status() == TaskStatus::Running && current.run_id().is_some()
    })
    .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn finished_job_cannot_be_paused() -> eyre::Result<()> {
    let ctx = harness(plan(vec![planned("docs", TaskRole::Docs, &[])]));
    let job = ctx.service.submit(request()).await?;
    let (_, handle) = ctx.service.start(job.id()).await?.into_parts();
    ctx.service.fail(job.id(), "operator stop").await?;
    tokio::time::timeout(Duration::from_secs(5), handle).await???;

    let paused = ctx.service.pause(job.id()).await;

    eyre::ensure!(paused.is_err(), "pause after failure succeeded");
    let stored = ctx.service.get_job(job.id()).await?;
    eyre::ensure!(stored.status() == JobStatus::Failed, "status {}", stored.status());
    eyre::ensure!(
        stored.error_message() == Some("operator stop"),
        "message {:?}",
        stored.error_message()
    );
    Ok(())
}
