//! GitHub REST adapter.

use crate::job::domain::BranchName;
use crate::source_control::{
    domain::{PullRequestDraft, RepositoryRef},
    ports::{SourceControl, SourceControlError, SourceControlResult},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT_HEADER: &str = "application/vnd.github+json";
const USER_AGENT: &str = "conductor";

/// GitHub-backed source control.
#[derive(Debug, Clone)]
pub struct GitHubSourceControl {
    client: Client,
    token: String,
    api_url: String,
}

impl GitHubSourceControl {
    /// Creates an adapter authenticating with `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_url: DEFAULT_API_URL.to_owned(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn repo_url(&self, repository: &RepositoryRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{path}",
            self.api_url.trim_end_matches('/'),
            repository.owner(),
            repository.name()
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Serialize)]
struct NewRef<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct NewPullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Deserialize)]
struct PullRequest {
    html_url: String,
}

async fn ensure_success(response: Response) -> SourceControlResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    Err(SourceControlError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SourceControl for GitHubSourceControl {
    async fn create_branch(
        &self,
        repository: &RepositoryRef,
        base: &BranchName,
        branch: &BranchName,
    ) -> SourceControlResult<()> {
        let base_url = self.repo_url(repository, &format!("git/ref/heads/{base}"));
        let base_response = self
            .authorized(self.client.get(base_url))
            .send()
            .await
            .map_err(SourceControlError::transport)?;
        let base_ref: GitRef = ensure_success(base_response)
            .await?
            .json()
            .await
            .map_err(|err| SourceControlError::InvalidResponse(err.to_string()))?;

        debug!(%repository, %branch, sha = base_ref.object.sha.as_str(), "creating branch");
        let body = NewRef {
            reference: format!("refs/heads/{branch}"),
            sha: &base_ref.object.sha,
        };
        let response = self
            .authorized(self.client.post(self.repo_url(repository, "git/refs")))
            .json(&body)
            .send()
            .await
            .map_err(SourceControlError::transport)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repository: &RepositoryRef,
        draft: &PullRequestDraft,
    ) -> SourceControlResult<String> {
        let body = NewPullRequest {
            title: draft.title(),
            body: draft.body(),
            head: draft.head().as_str(),
            base: draft.base().as_str(),
        };
        let response = self
            .authorized(self.client.post(self.repo_url(repository, "pulls")))
            .json(&body)
            .send()
            .await
            .map_err(SourceControlError::transport)?;
        let pull_request: PullRequest = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| SourceControlError::InvalidResponse(err.to_string()))?;
        Ok(pull_request.html_url)
    }
}
