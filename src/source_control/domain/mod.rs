//! Repository references and pull request drafts.

mod pull_request;
mod repository;

pub use pull_request::PullRequestDraft;
pub use repository::{RepositoryRef, RepositoryRefError};
