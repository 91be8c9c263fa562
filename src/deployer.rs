//! Stack deployment and teardown through the template engine

use crate::errors::{MonitorError, ProviderError, Result};
use crate::provider::{CloudProvider, StackReport, StackRequest};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// Outcome of the post-deploy function invocation
#[derive(Debug, Clone, PartialEq)]
pub enum SmokeTest {
    Passed(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub stack: StackReport,
    pub smoke_test: SmokeTest,
}

impl DeploymentOutcome {
    pub fn has_warnings(&self) -> bool {
        matches!(self.smoke_test, SmokeTest::Failed(_))
    }
}

pub struct Deployer<'a> {
    provider: &'a dyn CloudProvider,
}

impl<'a> Deployer<'a> {
    pub fn new(provider: &'a dyn CloudProvider) -> Self {
        Self { provider }
    }

    /// Create or update the stack, then invoke `function` once
    #[instrument(skip_all, fields(stack = %request.stack_name))]
    pub async fn deploy(&self, request: &StackRequest, function: &str) -> Result<DeploymentOutcome> {
        let stack = match self.provider.deploy_stack(request).await {
            Ok(report) => report,
            Err(e) => {
                let final_status = match self.provider.describe_stack(&request.stack_name).await {
                    Ok(report) => report.to_string(),
                    Err(_) => "status unavailable".to_string(),
                };
                error!("Deployment of {} failed: {}", request.stack_name, e);
                return Err(MonitorError::Deployment(format!("{} [{}]", e, final_status)));
            }
        };

        if stack.is_failed() || !stack.is_complete() {
            error!("Stack {} ended in {}", stack.stack_name, stack.status);
            return Err(MonitorError::Deployment(stack.to_string()));
        }

        info!("Stack {} reached {}", stack.stack_name, stack.status);
        let smoke_test = self.smoke_test(function).await;

        Ok(DeploymentOutcome { stack, smoke_test })
    }

    async fn smoke_test(&self, function: &str) -> SmokeTest {
        let payload = json!({ "symbols": ["AAPL", "GOOGL"] });

        match self.provider.invoke_function(function, &payload).await {
            Ok(invocation) if invocation.succeeded() => {
                info!("Smoke test of {} succeeded", function);
                SmokeTest::Passed(invocation.payload.to_string())
            }
            Ok(invocation) => {
                let reason = format!(
                    "status {} {}: {}",
                    invocation.status_code,
                    invocation.function_error.unwrap_or_default(),
                    invocation.payload
                );
                warn!("Smoke test of {} failed: {}", function, reason);
                SmokeTest::Failed(reason)
            }
            Err(e) => {
                warn!("Smoke test of {} could not run: {}", function, e);
                SmokeTest::Failed(e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanupReport {
    pub objects_deleted: usize,
    pub stack: StackReport,
    pub scratch_files_removed: Vec<PathBuf>,
}

pub struct Cleanup<'a> {
    provider: &'a dyn CloudProvider,
    scratch_dir: PathBuf,
    dashboard_path: PathBuf,
}

impl<'a> Cleanup<'a> {
    pub fn new(
        provider: &'a dyn CloudProvider,
        scratch_dir: impl Into<PathBuf>,
        dashboard_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            scratch_dir: scratch_dir.into(),
            dashboard_path: dashboard_path.into(),
        }
    }

    /// Empty the bucket, delete the stack, then drop local scratch files
    #[instrument(skip(self))]
    pub async fn run(&self, stack_name: &str, bucket: &str) -> Result<CleanupReport> {
        let objects_deleted = match self.provider.empty_bucket(bucket).await {
            Ok(count) => {
                info!("Deleted {} objects from {}", count, bucket);
                count
            }
            Err(ProviderError::NotFound(_)) => {
                info!("Bucket {} already gone", bucket);
                0
            }
            Err(e) => return Err(MonitorError::Provider(e)),
        };

        let stack = self
            .provider
            .delete_stack(stack_name)
            .await
            .map_err(MonitorError::Provider)?;
        if !stack.is_deleted() {
            error!("Deleting {} ended in {}", stack_name, stack.status);
            return Err(MonitorError::Deployment(stack.to_string()));
        }
        info!("Stack {} reached {}", stack_name, stack.status);

        let scratch_files_removed = self.remove_scratch_files().await?;

        Ok(CleanupReport {
            objects_deleted,
            stack,
            scratch_files_removed,
        })
    }

    async fn remove_scratch_files(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();

        if tokio::fs::try_exists(&self.scratch_dir).await? {
            let mut entries = tokio::fs::read_dir(&self.scratch_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if is_scratch_file(&path) && entry.file_type().await?.is_file() {
                    tokio::fs::remove_file(&path).await?;
                    removed.push(path);
                }
            }
        }

        if tokio::fs::try_exists(&self.dashboard_path).await? {
            tokio::fs::remove_file(&self.dashboard_path).await?;
            removed.push(self.dashboard_path.clone());
        }

        removed.sort();
        Ok(removed)
    }
}

/// Files written by the alert and status commands
fn is_scratch_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    (name.starts_with("alert_") && name.ends_with(".log"))
        || (name.starts_with("monitoring_status_") && name.ends_with(".json"))
}
