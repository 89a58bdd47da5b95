//! Source-control adapters.

pub mod disabled;
pub mod github;

pub use disabled::DisabledSourceControl;
pub use github::GitHubSourceControl;
