//! Source-control port.

use crate::job::domain::BranchName;
use crate::source_control::domain::{PullRequestDraft, RepositoryRef};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for source-control operations.
pub type SourceControlResult<T> = Result<T, SourceControlError>;

/// Branch and pull request operations on a hosted repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Creates `branch` from the tip of `base`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError`] when the base branch cannot be read or
    /// the branch cannot be created.
    async fn create_branch(
        &self,
        repository: &RepositoryRef,
        base: &BranchName,
        branch: &BranchName,
    ) -> SourceControlResult<()>;

    /// Opens a pull request and returns its URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError`] when the pull request cannot be
    /// created.
    async fn create_pull_request(
        &self,
        repository: &RepositoryRef,
        draft: &PullRequestDraft,
    ) -> SourceControlResult<String>;
}

/// Errors returned by source-control adapters.
#[derive(Debug, Clone, Error)]
pub enum SourceControlError {
    /// No source-control integration is configured.
    #[error("source control integration is disabled")]
    Disabled,

    /// The host answered with a non-success status.
    #[error("source control request failed ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response text.
        message: String,
    },

    /// The host answered with an unreadable payload.
    #[error("source control returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The host could not be reached.
    #[error("source control transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl SourceControlError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
