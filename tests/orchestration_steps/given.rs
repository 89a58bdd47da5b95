//! Given steps for orchestration scenarios.

use super::world::OrchestrationWorld;
use conductor::job::domain::TaskRole;
use conductor::planner::domain::PlannedTask;
use rstest_bdd_macros::given;

fn planned(name: &str, role: TaskRole, dependencies: Vec<String>) -> PlannedTask {
    PlannedTask {
        id: name.to_owned(),
        title: name.to_owned(),
        objective: format!("Deliver {name}"),
        role,
        dependencies,
        files: Vec::new(),
        definition_of_done: None,
    }
}

fn parse_role(role: &str) -> Result<TaskRole, eyre::Report> {
    TaskRole::try_from(role).map_err(|err| eyre::eyre!("invalid role in scenario: {err}"))
}

#[given(r#"a planned {role} task "{name}" with no dependencies"#)]
fn planned_task(
    world: &mut OrchestrationWorld,
    role: String,
    name: String,
) -> Result<(), eyre::Report> {
    world
        .planned
        .push(planned(&name, parse_role(&role)?, Vec::new()));
    Ok(())
}

#[given(r#"a planned {role} task "{name}" depending on "{dependency}""#)]
fn planned_dependent_task(
    world: &mut OrchestrationWorld,
    role: String,
    name: String,
    dependency: String,
) -> Result<(), eyre::Report> {
    world
        .planned
        .push(planned(&name, parse_role(&role)?, vec![dependency]));
    Ok(())
}

#[given("an empty plan")]
fn empty_plan(world: &mut OrchestrationWorld) {
    world.planned.clear();
}
