//! Branch-name value object shared by jobs and source control.

use super::{JobDomainError, JobId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a validated branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 200;

/// Prefix for branches created on behalf of a job.
const JOB_BRANCH_PREFIX: &str = "conductor";

/// Validated Git branch name.
///
/// Branch names must be non-empty after trimming, must not contain
/// whitespace or colon characters, and must not exceed
/// `MAX_BRANCH_NAME_LENGTH` characters.
///
/// # Examples
///
///     use conductor::job::domain::BranchName;
///
///     let name = BranchName::new("main").expect("valid");
///     assert_eq!(name.as_str(), "main");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidBranchName`] when the value is empty,
    /// contains a colon or whitespace, or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, JobDomainError> {
        let raw = value.into();
        let normalized = raw.trim();

        let is_empty = normalized.is_empty();
        let contains_forbidden_char =
            normalized.contains(':') || normalized.chars().any(char::is_whitespace);
        let exceeds_length_limit = normalized.len() > MAX_BRANCH_NAME_LENGTH;
        if is_empty || contains_forbidden_char || exceeds_length_limit {
            return Err(JobDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the branch name used for work produced by the given job.
    #[must_use]
    pub fn for_job(job_id: JobId) -> Self {
        Self(format!("{JOB_BRANCH_PREFIX}/{job_id}"))
    }

    /// Returns the default integration branch, `main`.
    #[must_use]
    pub fn main() -> Self {
        Self("main".to_owned())
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
