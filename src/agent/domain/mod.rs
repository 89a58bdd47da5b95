//! Launch request and prompt rendering for execution agents.

mod launch;
mod prompt;

pub use launch::LaunchRequest;
pub use prompt::{PromptError, render_launch_prompt, role_guidance};
