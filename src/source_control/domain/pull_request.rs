//! Pull request content for a job.

use crate::job::domain::{BranchName, Job};

const MAX_TITLE_GOAL_CHARS: usize = 100;

/// Pull request to open for a job's work branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    title: String,
    body: String,
    head: BranchName,
    base: BranchName,
}

impl PullRequestDraft {
    /// Creates a draft merging `head` into the job's base branch.
    ///
    /// The title carries at most the first 100 characters of the goal.
    #[must_use]
    pub fn for_job(job: &Job, head: BranchName) -> Self {
        let summary: String = job.goal().chars().take(MAX_TITLE_GOAL_CHARS).collect();
        Self {
            title: format!("Conductor: {summary}"),
            body: format!(
                "This PR was created by Conductor to implement: {}",
                job.goal()
            ),
            head,
            base: job.base_branch().clone(),
        }
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the head branch.
    #[must_use]
    pub const fn head(&self) -> &BranchName {
        &self.head
    }

    /// Returns the base branch.
    #[must_use]
    pub const fn base(&self) -> &BranchName {
        &self.base
    }
}
