//! Hosted repository reference parsing.

use std::fmt;
use thiserror::Error;

const GITHUB_HOST: &str = "github.com";

/// Error returned when a repository reference cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid repository reference '{0}'")]
pub struct RepositoryRefError(pub String);

/// Owner and name of a hosted repository.
///
/// Accepts `https://github.com/owner/repo`, `git@github.com:owner/repo.git`
/// and the bare `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Parses a repository reference.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryRefError`] when the value does not name exactly
    /// one owner and one repository.
    pub fn parse(value: &str) -> Result<Self, RepositoryRefError> {
        let invalid = || RepositoryRefError(value.to_owned());
        let trimmed = value.trim().trim_end_matches('/');
        let without_suffix = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let path = match without_suffix.find(GITHUB_HOST) {
            Some(index) => without_suffix
                .get(index + GITHUB_HOST.len()..)
                .and_then(|rest| rest.strip_prefix('/').or_else(|| rest.strip_prefix(':')))
                .ok_or_else(invalid)?,
            None if without_suffix.contains("://") || without_suffix.contains('@') => {
                return Err(invalid());
            }
            None => without_suffix,
        };

        let mut segments = path.split('/');
        let (Some(owner), Some(name), None) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(invalid());
        };
        let is_valid_segment =
            |segment: &str| !segment.is_empty() && !segment.chars().any(char::is_whitespace);
        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Returns the repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
