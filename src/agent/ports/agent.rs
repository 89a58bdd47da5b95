//! Execution agent port.

use crate::agent::domain::{LaunchRequest, PromptError};
use crate::job::domain::RunId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for execution agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// External service that performs task work.
///
/// Launching only starts the work. The outcome arrives later as a
/// completion signal carrying the returned run reference.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionAgent: Send + Sync {
    /// Starts work on `request` and returns the run reference.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the agent is unreachable or rejects the
    /// request. Dispatch treats every launch error as a failed attempt.
    async fn launch(&self, request: &LaunchRequest) -> AgentResult<RunId>;
}

/// Errors returned by execution agents.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// No credentials are configured for the agent.
    #[error("execution agent credentials are not configured")]
    MissingCredentials,

    /// The agent answered with a non-success status.
    #[error("execution agent rejected the launch ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message returned by the agent.
        message: String,
    },

    /// The agent answered with an unreadable acknowledgment.
    #[error("execution agent returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The launch prompt could not be built.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The agent could not be reached.
    #[error("execution agent unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentError {
    /// Wraps a transport error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
