//! Planning services.

mod planner;

pub use planner::{PlannerService, PlanningError, PlanningResult, remap_plan};
