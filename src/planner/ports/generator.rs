//! Plan generator port.

use crate::planner::domain::{Plan, PlanRequest};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for plan generation.
pub type PlanGeneratorResult<T> = Result<T, PlanGeneratorError>;

/// Generative component that decomposes a goal into a phased plan.
///
/// Implementations only produce structure. Validation and identifier
/// remapping happen in the planner service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generates a plan for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanGeneratorError`] when the generator is unreachable,
    /// rejects the request, or answers with something that is not a plan.
    async fn generate(&self, request: &PlanRequest) -> PlanGeneratorResult<Plan>;
}

/// Errors returned by plan generators.
#[derive(Debug, Clone, Error)]
pub enum PlanGeneratorError {
    /// No credentials are configured for the generator.
    #[error("plan generator credentials are not configured")]
    MissingCredentials,

    /// The generator answered with a non-success status.
    #[error("plan generator rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message returned by the generator.
        message: String,
    },

    /// The generator answered with content that is not a valid plan.
    #[error("plan generator returned a malformed plan: {0}")]
    MalformedResponse(String),

    /// The generator could not be reached.
    #[error("plan generator transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl PlanGeneratorError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
