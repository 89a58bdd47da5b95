//! Generator that always answers with a preconfigured plan.

use crate::planner::{
    domain::{Plan, PlanRequest},
    ports::{PlanGenerator, PlanGeneratorResult},
};
use async_trait::async_trait;

/// Plan generator returning the same plan for every request.
///
/// Used for offline runs and tests where no generative service is
/// available.
#[derive(Debug, Clone, Default)]
pub struct FixedPlanGenerator {
    plan: Plan,
}

impl FixedPlanGenerator {
    /// Creates a generator answering with `plan`.
    #[must_use]
    pub const fn new(plan: Plan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl PlanGenerator for FixedPlanGenerator {
    async fn generate(&self, _request: &PlanRequest) -> PlanGeneratorResult<Plan> {
        Ok(self.plan.clone())
    }
}
