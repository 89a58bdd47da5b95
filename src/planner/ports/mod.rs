//! Port contracts for plan generation.

mod generator;

#[cfg(test)]
pub(crate) use generator::MockPlanGenerator;
pub use generator::{PlanGenerator, PlanGeneratorError, PlanGeneratorResult};
