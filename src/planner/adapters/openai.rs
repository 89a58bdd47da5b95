//! Plan generator backed by an OpenAI-compatible chat completions API.

use crate::planner::{
    domain::{Plan, PlanRequest},
    ports::{PlanGenerator, PlanGeneratorError, PlanGeneratorResult},
};
use async_trait::async_trait;
use minijinja::{Environment, context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default chat completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model used for planning.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

const PLANNER_PROMPT: &str = r#"You are Conductor's Planner. Break the goal below into a structured plan of tasks.

REPO: {{ repository }}
BRANCH: {{ base_branch }}
GOAL: {{ goal }}
{% if repository_context %}
REPO CONTEXT:
{{ repository_context }}
{% endif %}
RULES:
1. Only create structure (tasks, dependencies, phases). Never write code.
2. Every task needs a clear objective and a definition of done.
3. Assign each task one role: CODER, TESTER, REVIEWER, DOCS or FIXER.
4. Dependencies must only name tasks that appear earlier in the plan.
5. Include at least one TESTER task to validate the work.
6. Keep tasks specific and actionable so an autonomous coding agent can execute each one alone.

Answer with a JSON object of the form:
{"phases": [{"name": "...", "tasks": [{"id": "...", "title": "...", "objective": "...", "role": "CODER", "dependencies": [], "files": [], "definition_of_done": "..."}]}]}"#;

/// OpenAI-compatible plan generator.
#[derive(Debug, Clone)]
pub struct OpenAiPlanGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenAiPlanGenerator {
    /// Creates a generator using `api_key` with the default model and
    /// endpoint.
    ///
    /// A missing key is reported on the first planning call.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }

    /// Overrides the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the chat completions endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Renders the planning prompt for `request`.
///
/// # Errors
///
/// Returns [`PlanGeneratorError::MalformedResponse`] when the template
/// cannot be rendered.
pub fn render_prompt(request: &PlanRequest) -> PlanGeneratorResult<String> {
    let environment = Environment::new();
    environment
        .render_str(
            PLANNER_PROMPT,
            context! {
                repository => request.repository(),
                base_branch => request.base_branch().as_str(),
                goal => request.goal(),
                repository_context => request.repository_context(),
            },
        )
        .map_err(|err| PlanGeneratorError::MalformedResponse(err.to_string()))
}

#[async_trait]
impl PlanGenerator for OpenAiPlanGenerator {
    async fn generate(&self, request: &PlanRequest) -> PlanGeneratorResult<Plan> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(PlanGeneratorError::MissingCredentials)?;
        let prompt = render_prompt(request)?;
        let body = ChatRequest {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.model, repository = request.repository(), "requesting plan");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(PlanGeneratorError::transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(PlanGeneratorError::transport)?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(PlanGeneratorError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = serde_json::from_str(&text)
            .map_err(|err| PlanGeneratorError::MalformedResponse(err.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PlanGeneratorError::MalformedResponse("empty completion".to_owned()))?;
        serde_json::from_str(&content)
            .map_err(|err| PlanGeneratorError::MalformedResponse(err.to_string()))
    }
}
