pub mod credentials;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::IssueTrackerError;

/// An issue and its discussion, as quoted in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueContext {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub labels: BTreeSet<String>,
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub author: String,
}

/// Read-only access to an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn fetch_issue(&self, repo: &str, number: u64) -> Result<IssueContext, IssueTrackerError>;
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Deserialize)]
struct GhComment {
    id: u64,
    body: Option<String>,
    user: Option<GhUser>,
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

/// GitHub REST implementation of `IssueTracker`.
pub struct GitHubClient {
    client: Client,
    token: String,
    api_base_url: String,
}

impl GitHubClient {
    pub fn new(
        token: String,
        api_base_url: String,
        timeout: Duration,
    ) -> Result<Self, IssueTrackerError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitscribe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IssueTrackerError::Request(e.to_string()))?;

        Ok(GitHubClient {
            client,
            token,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, IssueTrackerError> {
        log::debug!("GET {url}");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| IssueTrackerError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(IssueTrackerError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| IssueTrackerError::Request(format!("failed to decode {url}: {e}")))
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn fetch_issue(&self, repo: &str, number: u64) -> Result<IssueContext, IssueTrackerError> {
        let issue_url = format!("{}/repos/{repo}/issues/{number}", self.api_base_url);
        let issue: GhIssue = self.get_json(&issue_url).await?;
        let comments: Vec<GhComment> = self.get_json(&format!("{issue_url}/comments")).await?;

        log::info!(
            "Loaded issue #{} with {} comment(s)",
            issue.number,
            comments.len()
        );

        Ok(into_issue_context(issue, comments))
    }
}

fn into_issue_context(issue: GhIssue, comments: Vec<GhComment>) -> IssueContext {
    IssueContext {
        id: issue.number,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        comments: comments
            .into_iter()
            .map(|c| IssueComment {
                id: c.id,
                body: c.body.unwrap_or_default(),
                author: c.user.map(|u| u.login).unwrap_or_else(|| "unknown".into()),
            })
            .collect(),
    }
}
