//! Adapter used when no source-control token is configured.

use crate::job::domain::BranchName;
use crate::source_control::{
    domain::{PullRequestDraft, RepositoryRef},
    ports::{SourceControl, SourceControlError, SourceControlResult},
};
use async_trait::async_trait;

/// Source control that refuses every operation with
/// [`SourceControlError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSourceControl;

#[async_trait]
impl SourceControl for DisabledSourceControl {
    async fn create_branch(
        &self,
        _repository: &RepositoryRef,
        _base: &BranchName,
        _branch: &BranchName,
    ) -> SourceControlResult<()> {
        Err(SourceControlError::Disabled)
    }

    async fn create_pull_request(
        &self,
        _repository: &RepositoryRef,
        _draft: &PullRequestDraft,
    ) -> SourceControlResult<String> {
        Err(SourceControlError::Disabled)
    }
}
