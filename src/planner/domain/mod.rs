//! Plan request and plan output types.

mod plan;

pub use plan::{Plan, PlanPhase, PlanRequest, PlannedTask};
