//! Then steps for orchestration scenarios.

use super::world::{OrchestrationWorld, run_async, wait_limit};
use conductor::job::domain::{JobStatus, TaskEventKind, TaskStatus};
use conductor::orchestration::domain::LoopExit;
use rstest_bdd_macros::then;
use std::time::Duration;

fn parse_task_status(status: &str) -> Result<TaskStatus, eyre::Report> {
    TaskStatus::try_from(status).map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))
}

fn parse_job_status(status: &str) -> Result<JobStatus, eyre::Report> {
    JobStatus::try_from(status).map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))
}

#[then(r#"task "{name}" becomes "{status}""#)]
fn task_becomes(world: &OrchestrationWorld, name: String, status: String) -> Result<(), eyre::Report> {
    let expected = parse_task_status(&status)?;
    run_async(world.wait_for_task(&name, &format!("became {status}"), |task| {
        task.status() == expected
            && (expected != TaskStatus::Running || task.run_id().is_some())
    }))?;
    Ok(())
}

#[then(r#"task "{name}" is still "{status}""#)]
fn task_is_still(world: &OrchestrationWorld, name: String, status: String) -> Result<(), eyre::Report> {
    let expected = parse_task_status(&status)?;
    let task = run_async(world.task(&name))?;
    eyre::ensure!(
        task.status() == expected,
        "expected task '{name}' to be {expected}, found {}",
        task.status()
    );
    Ok(())
}

#[then(r#"task "{name}" ended "{status}" after {attempts:u32} attempts"#)]
fn task_ended(
    world: &OrchestrationWorld,
    name: String,
    status: String,
    attempts: u32,
) -> Result<(), eyre::Report> {
    let expected = parse_task_status(&status)?;
    let task = run_async(world.wait_for_task(&name, &format!("ended {status}"), |task| {
        task.status() == expected
    }))?;
    eyre::ensure!(
        task.attempt_count() == attempts,
        "expected {attempts} attempts, found {}",
        task.attempt_count()
    );
    eyre::ensure!(task.error_message().is_some(), "failure cause not recorded");
    Ok(())
}

#[then(r#"task "{name}" recorded events "{events}""#)]
fn task_recorded_events(
    world: &OrchestrationWorld,
    name: String,
    events: String,
) -> Result<(), eyre::Report> {
    let expected: Vec<TaskEventKind> = events
        .split(',')
        .map(|kind| {
            TaskEventKind::try_from(kind)
                .map_err(|err| eyre::eyre!("invalid event kind in scenario: {err}"))
        })
        .collect::<Result<_, _>>()?;
    let task_id = world.task_id(&name)?;
    let recorded: Vec<TaskEventKind> = run_async(world.service()?.list_events(task_id))?
        .iter()
        .map(|event| event.kind())
        .collect();
    eyre::ensure!(
        recorded == expected,
        "expected events {expected:?}, found {recorded:?}"
    );
    Ok(())
}

#[then(r#"the job finishes as "{status}""#)]
fn job_finishes_as(world: &mut OrchestrationWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_job_status(&status)?;
    let handle = world
        .loop_handle
        .take()
        .ok_or_else(|| eyre::eyre!("no orchestration loop running in scenario"))?;
    let exit = run_async(tokio::time::timeout(wait_limit(), handle))
        .map_err(|_| eyre::eyre!("orchestration loop did not stop in time"))???;
    eyre::ensure!(
        exit == LoopExit::Finished(expected),
        "expected loop to finish as {expected}, got {exit:?}"
    );
    let job_id = world.job()?.id();
    let stored = run_async(world.service()?.get_job(job_id))?;
    eyre::ensure!(stored.status() == expected, "job status is {}", stored.status());
    Ok(())
}

#[then(r#"the job is still "{status}" after the loop has ticked"#)]
fn job_is_still(world: &OrchestrationWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_job_status(&status)?;
    run_async(tokio::time::sleep(Duration::from_millis(100)));
    let job_id = world.job()?.id();
    let stored = run_async(world.service()?.get_job(job_id))?;
    eyre::ensure!(
        stored.status() == expected,
        "expected job to stay {expected}, found {}",
        stored.status()
    );
    let still_running = world
        .loop_handle
        .as_ref()
        .is_some_and(|handle| !handle.is_finished());
    eyre::ensure!(still_running, "orchestration loop stopped unexpectedly");
    Ok(())
}

#[then("the agent received {count:u32} launches")]
fn agent_received_launches(world: &OrchestrationWorld, count: u32) -> Result<(), eyre::Report> {
    let launches = u32::try_from(world.agent.launches()?.len())?;
    eyre::ensure!(
        launches == count,
        "expected {count} launches, found {launches}"
    );
    Ok(())
}
