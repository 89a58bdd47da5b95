//! Role-aware prompt rendering.

use super::LaunchRequest;
use crate::job::domain::TaskRole;
use minijinja::{Environment, context};
use thiserror::Error;

const LAUNCH_PROMPT: &str = "You are a {{ role }} agent working on task: {{ title }}

OBJECTIVE: {{ objective }}
{% if files %}
FILES TO FOCUS ON:
{% for file in files %}- {{ file }}
{% endfor %}{% endif %}
DEFINITION OF DONE: {{ definition_of_done }}

TASK ID: {{ task_id }}
JOB ID: {{ job_id }}

Complete this task according to the objective and definition of done.
{% if guidance %}
As a {{ role }} agent, you should:
{% for line in guidance %}- {{ line }}
{% endfor %}{% endif %}";

/// Error returned when a launch prompt cannot be rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to render launch prompt: {0}")]
pub struct PromptError(pub String);

/// Returns the working instructions given to agents of `role`.
#[must_use]
pub const fn role_guidance(role: TaskRole) -> &'static [&'static str] {
    match role {
        TaskRole::Planner => &[],
        TaskRole::Coder => &[
            "Write clean, well-structured code",
            "Follow existing code patterns and conventions",
            "Add documentation where it helps",
            "Keep the code testable",
        ],
        TaskRole::Tester => &[
            "Write thorough tests",
            "Cover the edge cases",
            "Run the existing tests to verify nothing broke",
            "Fix any failing tests",
        ],
        TaskRole::Reviewer => &[
            "Review the changes for quality, correctness and style",
            "Look for potential bugs",
            "Check the changes follow the project's conventions",
            "Give constructive feedback",
        ],
        TaskRole::Docs => &[
            "Write clear documentation",
            "Update README files as needed",
            "Document API changes",
            "Add inline documentation where appropriate",
        ],
        TaskRole::Fixer => &[
            "Fix issues identified by earlier tasks",
            "Address test failures",
            "Resolve review feedback",
            "Make sure every fix is tested",
        ],
    }
}

/// Renders the prompt sent to the execution agent for `request`.
///
/// # Errors
///
/// Returns [`PromptError`] when the template cannot be rendered.
pub fn render_launch_prompt(request: &LaunchRequest) -> Result<String, PromptError> {
    let role = request.role().as_str().to_ascii_uppercase();
    let environment = Environment::new();
    environment
        .render_str(
            LAUNCH_PROMPT,
            context! {
                role => role,
                title => request.title(),
                objective => request.objective(),
                files => request.files(),
                definition_of_done => request.definition_of_done().unwrap_or("not specified"),
                task_id => request.task_id().to_string(),
                job_id => request.job_id().to_string(),
                guidance => role_guidance(request.role()),
            },
        )
        .map_err(|err| PromptError(err.to_string()))
}
