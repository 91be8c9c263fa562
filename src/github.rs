//! Latest CI workflow run from the GitHub Actions API

use crate::config::Config;
use crate::errors::{MonitorError, Result};
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRun {
    #[serde(default)]
    pub id: u64,
    pub name: Option<String>,
    /// Workflow file, e.g. `.github/workflows/deploy.yml`
    #[serde(default)]
    pub path: Option<String>,
    pub status: String,
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub html_url: Option<String>,
}

impl WorkflowRun {
    /// Run name, else the workflow file name, else the run id
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match self.path.as_deref().and_then(|p| p.rsplit('/').next()).filter(|f| !f.is_empty()) {
            Some(file) => file.to_string(),
            None => format!("run {}", self.id),
        }
    }

    /// `completed/success`, `in_progress`, ...
    pub fn outcome(&self) -> String {
        match &self.conclusion {
            Some(conclusion) => format!("{}/{}", self.status, conclusion),
            None => self.status.clone(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.conclusion.as_deref() == Some("success")
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: String, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("mlops_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.github_api_url.clone(), config.github_token.clone())
    }

    /// Most recent workflow run of `owner/repo`, if any
    pub async fn latest_run(&self, repo: &str) -> Result<Option<WorkflowRun>> {
        let url = format!("{}/repos/{}/actions/runs?per_page=1", self.api_url, repo);
        debug!("Fetching latest workflow run from {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Other(format!(
                "GitHub API returned {} for {}",
                status, repo
            )));
        }

        let page: WorkflowRunsPage = response.json().await?;
        Ok(page.workflow_runs.into_iter().next())
    }
}

/// What the dashboard and status output show for the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStatus {
    NotConfigured,
    NoRuns,
    Latest(WorkflowRun),
    Unavailable(String),
}

impl PipelineStatus {
    pub fn summary(&self) -> String {
        match self {
            PipelineStatus::NotConfigured => "not configured".to_string(),
            PipelineStatus::NoRuns => "no workflow runs yet".to_string(),
            PipelineStatus::Latest(run) => format!(
                "{} {} at {}",
                run.display_name(),
                run.outcome(),
                run.created_at.format("%Y-%m-%d %H:%M UTC")
            ),
            PipelineStatus::Unavailable(reason) => format!("unavailable ({})", reason),
        }
    }
}

/// Pipeline lookup that never fails the calling command
pub async fn pipeline_status(config: &Config) -> PipelineStatus {
    let Some(repo) = &config.github_repo else {
        return PipelineStatus::NotConfigured;
    };

    let client = match GitHubClient::from_config(config) {
        Ok(client) => client,
        Err(e) => return PipelineStatus::Unavailable(e.to_string()),
    };

    match client.latest_run(repo).await {
        Ok(Some(run)) => PipelineStatus::Latest(run),
        Ok(None) => PipelineStatus::NoRuns,
        Err(e) => {
            warn!("Pipeline status lookup for {} failed: {}", repo, e);
            PipelineStatus::Unavailable(e.to_string())
        }
    }
}
