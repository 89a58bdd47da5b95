//! Port contracts for source control.

mod source_control;

#[cfg(test)]
pub(crate) use source_control::MockSourceControl;
pub use source_control::{SourceControl, SourceControlError, SourceControlResult};
