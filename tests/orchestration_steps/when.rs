//! When steps for orchestration scenarios.

use super::world::{OrchestrationWorld, run_async};
use conductor::job::domain::{RunId, TaskOutcome, TaskStatus};
use conductor::orchestration::{domain::CompletionSignal, services::SubmitJobRequest};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the job is submitted and started")]
fn submit_and_start(world: &mut OrchestrationWorld) -> Result<(), eyre::Report> {
    let service = world.build_service();
    let request = SubmitJobRequest::new("Ship the scenario feature", "acme/web");
    let job = run_async(service.submit(request)).wrap_err("submit job")?;
    let tasks = run_async(service.list_tasks(job.id())).wrap_err("list planned tasks")?;
    let running = run_async(service.start(job.id())).wrap_err("start job")?;

    world.task_ids = tasks
        .iter()
        .map(|task| (task.title().to_owned(), task.id()))
        .collect();
    let (started, handle) = running.into_parts();
    world.job = Some(started);
    world.loop_handle = Some(handle);
    Ok(())
}

#[when(r#"task "{name}" reports "{outcome}""#)]
fn task_reports(
    world: &mut OrchestrationWorld,
    name: String,
    outcome: String,
) -> Result<(), eyre::Report> {
    let reported = match outcome.as_str() {
        "completed" => TaskOutcome::Completed,
        "failed" => TaskOutcome::Failed,
        other => return Err(eyre::eyre!("unknown outcome '{other}' in scenario")),
    };
    let task = run_async(world.task(&name))?;
    let mut signal = CompletionSignal::new(task.id(), reported);
    if let Some(run_id) = task.run_id() {
        signal = signal.with_run_id(run_id.clone());
    }
    run_async(world.service()?.report_outcome(&signal)).wrap_err("report outcome")?;
    Ok(())
}

#[when(r#"task "{name}" fails a retryable attempt {count:u32} times"#)]
fn task_fails_attempts(
    world: &mut OrchestrationWorld,
    name: String,
    count: u32,
) -> Result<(), eyre::Report> {
    let mut previous_run: Option<RunId> = None;
    for attempt in 1..=count {
        let launched = run_async(world.wait_for_task(&name, "relaunched", |task| {
            task.status() == TaskStatus::Running
                && task.run_id().is_some()
                && task.run_id() != previous_run.as_ref()
        }))?;
        let run_id = launched.run_id().cloned();
        let disposition = run_async(world.service()?.report_attempt_failure(
            launched.id(),
            run_id.as_ref(),
            "agent timed out",
        ))
        .wrap_err("report attempt failure")?;
        eyre::ensure!(
            disposition.is_some(),
            "attempt {attempt} of task '{name}' was not recorded"
        );
        previous_run = run_id;
    }
    Ok(())
}
