//! Background-agent HTTP adapter.

use crate::agent::{
    domain::{LaunchRequest, render_launch_prompt},
    ports::{AgentError, AgentResult, ExecutionAgent},
};
use crate::job::domain::{JobId, RunId, TaskId, TaskRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default base URL of the background-agent API.
pub const DEFAULT_BASE_URL: &str = "https://api.cursor.com/v1";

/// Execution agent that launches background agents over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExecutionAgent {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl HttpExecutionAgent {
    /// Creates an agent client using `api_key` against the default base URL.
    ///
    /// A missing key is reported on the first launch.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("execution agent API key not set; launches will fail");
        }
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn launch_url(&self) -> String {
        format!("{}/background-agents", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct LaunchBody<'a> {
    prompt: String,
    context: LaunchContext<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchContext<'a> {
    task_id: TaskId,
    job_id: JobId,
    role: TaskRole,
    files: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaunchAck {
    #[serde(default)]
    run_id: Option<String>,
}

#[async_trait]
impl ExecutionAgent for HttpExecutionAgent {
    async fn launch(&self, request: &LaunchRequest) -> AgentResult<RunId> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AgentError::MissingCredentials)?;
        let body = LaunchBody {
            prompt: render_launch_prompt(request)?,
            context: LaunchContext {
                task_id: request.task_id(),
                job_id: request.job_id(),
                role: request.role(),
                files: request.files(),
            },
        };

        debug!(task_id = %request.task_id(), "launching background agent");
        let response = self
            .client
            .post(self.launch_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(AgentError::unavailable)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(AgentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let ack: LaunchAck = response
            .json()
            .await
            .map_err(|err| AgentError::InvalidResponse(err.to_string()))?;
        match ack.run_id.filter(|run| !run.trim().is_empty()) {
            Some(run) => RunId::new(run).map_err(|err| AgentError::InvalidResponse(err.to_string())),
            None => {
                warn!(
                    task_id = %request.task_id(),
                    "agent acknowledged without a run id; generating one"
                );
                RunId::new(format!("run-{}", Uuid::new_v4()))
                    .map_err(|err| AgentError::InvalidResponse(err.to_string()))
            }
        }
    }
}
