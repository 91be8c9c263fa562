//! Configuration management for the deployment monitor

use crate::errors::{MonitorError, Result};
use crate::resource::ResourceId;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AWS region hosting the stack
    pub region: String,

    /// AWS account id; discovered through STS when unset
    pub account_id: Option<String>,

    /// Explicit bucket name; derived from account and region when unset
    pub bucket_name: Option<String>,

    /// Data collection function
    pub function_name: String,

    /// Scheduler rule triggering the function
    pub rule_name: String,

    /// CloudFormation stack name
    pub stack_name: String,

    /// Path to the stack template
    pub template_path: PathBuf,

    /// Schedule expression passed to the rule
    pub collection_schedule: String,

    /// Output path of the generated dashboard
    pub dashboard_path: PathBuf,

    /// Directory for alert logs and status snapshots
    pub scratch_dir: PathBuf,

    /// Monthly cost ceiling in USD
    pub monthly_budget_usd: f64,

    /// Provider command-line client
    pub aws_cli: String,

    /// Named provider profile
    pub aws_profile: Option<String>,

    /// Upper bound per provider call; none means the client default
    pub command_timeout: Option<Duration>,

    /// `owner/repo` whose workflow runs are reported
    pub github_repo: Option<String>,

    /// Token for the GitHub API
    #[serde(skip_serializing)]
    pub github_token: Option<String>,

    /// GitHub API base URL
    pub github_api_url: String,

    /// Pre-supplied cleanup confirmation
    pub cleanup_confirmation: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: None,
            bucket_name: None,
            function_name: "stock-data-collector".to_string(),
            rule_name: "daily-stock-collection".to_string(),
            stack_name: "mlops-stock-prediction".to_string(),
            template_path: PathBuf::from("deployment/stack.yaml"),
            collection_schedule: "cron(0 9 * * ? *)".to_string(),
            dashboard_path: PathBuf::from("mlops_dashboard.html"),
            scratch_dir: PathBuf::from("reports"),
            monthly_budget_usd: 1.0,
            aws_cli: "aws".to_string(),
            aws_profile: None,
            command_timeout: None,
            github_repo: None,
            github_token: None,
            github_api_url: "https://api.github.com".to_string(),
            cleanup_confirmation: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = var("MLOPS_REGION") {
            config.region = region;
        }

        config.account_id = var("MLOPS_ACCOUNT_ID");
        config.bucket_name = var("MLOPS_BUCKET_NAME");

        if let Some(function_name) = var("MLOPS_FUNCTION_NAME") {
            config.function_name = function_name;
        }

        if let Some(rule_name) = var("MLOPS_RULE_NAME") {
            config.rule_name = rule_name;
        }

        if let Some(stack_name) = var("MLOPS_STACK_NAME") {
            config.stack_name = stack_name;
        }

        if let Some(template_path) = var("MLOPS_TEMPLATE_PATH") {
            config.template_path = PathBuf::from(template_path);
        }

        if let Some(schedule) = var("MLOPS_COLLECTION_SCHEDULE") {
            config.collection_schedule = schedule;
        }

        if let Some(dashboard_path) = var("MLOPS_DASHBOARD_PATH") {
            config.dashboard_path = PathBuf::from(dashboard_path);
        }

        if let Some(scratch_dir) = var("MLOPS_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(scratch_dir);
        }

        if let Some(budget) = var("MLOPS_MONTHLY_BUDGET_USD") {
            if let Ok(usd) = budget.parse() {
                config.monthly_budget_usd = usd;
            }
        }

        if let Some(cli) = var("MLOPS_AWS_CLI") {
            config.aws_cli = cli;
        }

        config.aws_profile = var("AWS_PROFILE");

        if let Some(timeout) = var("MLOPS_COMMAND_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.command_timeout = Some(Duration::from_secs(seconds));
            }
        }

        config.github_repo = var("MLOPS_GITHUB_REPO");
        config.github_token = var("GITHUB_TOKEN");

        if let Some(api_url) = var("MLOPS_GITHUB_API_URL") {
            config.github_api_url = api_url.trim_end_matches('/').to_string();
        }

        config.cleanup_confirmation = var("MLOPS_CLEANUP_CONFIRM");

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("region", &self.region),
            ("function_name", &self.function_name),
            ("rule_name", &self.rule_name),
            ("stack_name", &self.stack_name),
            ("aws_cli", &self.aws_cli),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(MonitorError::ConfigurationMissing(format!(
                    "{} cannot be empty",
                    field
                )));
            }
        }

        if !(self.monthly_budget_usd.is_finite() && self.monthly_budget_usd >= 0.0) {
            return Err(MonitorError::ConfigurationMissing(
                "monthly_budget_usd must be a non-negative amount".to_string(),
            ));
        }

        if let Some(repo) = &self.github_repo {
            if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
                return Err(MonitorError::ConfigurationMissing(format!(
                    "github_repo must look like owner/repo, got {}",
                    repo
                )));
            }
        }

        Ok(())
    }

    /// Bucket name, derived as `mlops-stock-data-<account>-<region>` when not set
    pub fn bucket_name(&self) -> Result<String> {
        if let Some(bucket) = &self.bucket_name {
            return Ok(bucket.clone());
        }

        match &self.account_id {
            Some(account) => Ok(format!("mlops-stock-data-{}-{}", account, self.region)),
            None => Err(MonitorError::ConfigurationMissing(
                "bucket name (set MLOPS_BUCKET_NAME or MLOPS_ACCOUNT_ID)".to_string(),
            )),
        }
    }

    /// Resources the stack is expected to contain
    pub fn expected_resources(&self) -> Result<Vec<ResourceId>> {
        Ok(vec![
            ResourceId::bucket(self.bucket_name()?),
            ResourceId::function(&self.function_name),
            ResourceId::rule(&self.rule_name),
        ])
    }
}
