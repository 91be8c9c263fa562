//! Entry points for each CLI subcommand
//!
//! Every command returns the process exit code on completion. Errors that
//! escape are fatal and turned into a non-zero code by [`exit_code`].

use crate::alert::{log_alert, AlertEvaluator};
use crate::config::Config;
use crate::cost::ESTIMATE;
use crate::dashboard::DashboardGenerator;
use crate::deployer::{Cleanup, Deployer, SmokeTest};
use crate::errors::{MonitorError, Result};
use crate::github::pipeline_status;
use crate::provider::{CloudProvider, StackRequest};
use crate::status::{StatusChecker, StatusReport};
use chrono::Utc;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, instrument, warn};

pub const EXIT_OK: u8 = 0;
pub const EXIT_UNHEALTHY: u8 = 1;

/// Word that must be typed to allow cleanup
pub const CLEANUP_CONFIRMATION: &str = "DELETE";

fn exit_for(healthy: bool) -> u8 {
    if healthy { EXIT_OK } else { EXIT_UNHEALTHY }
}

/// Exit code for a finished command; errors are logged and reported on stderr
pub fn exit_code(command: &str, result: Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{} failed: {}", command, e);
            eprintln!("{}", e);
            EXIT_UNHEALTHY
        }
    }
}

/// Fill in the account id from the caller identity when nothing names the bucket
pub async fn resolve_account(config: &Config, provider: &dyn CloudProvider) -> Result<Config> {
    if config.bucket_name.is_some() || config.account_id.is_some() {
        return Ok(config.clone());
    }

    let account = provider.caller_account().await.map_err(|e| {
        MonitorError::ConfigurationMissing(format!("account id (discovery failed: {})", e))
    })?;
    info!("Discovered account {}", account);

    let mut resolved = config.clone();
    resolved.account_id = Some(account);
    Ok(resolved)
}

async fn check_resources(config: &Config, provider: &dyn CloudProvider) -> Result<(Config, StatusReport)> {
    let config = resolve_account(config, provider).await?;
    let expected = config.expected_resources()?;
    let report = StatusChecker::new(provider).check(&expected).await;
    Ok((config, report))
}

#[instrument(skip_all)]
pub async fn run_status(config: &Config, provider: &dyn CloudProvider) -> Result<u8> {
    let (config, report) = check_resources(config, provider).await?;
    let pipeline = pipeline_status(&config).await;

    println!("{}", report.render());
    println!("Pipeline: {}", pipeline.summary());

    match report.write_snapshot(&config.scratch_dir).await {
        Ok(path) => println!("Snapshot: {}", path.display()),
        Err(e) => warn!("Could not write status snapshot: {}", e),
    }

    Ok(exit_for(report.is_healthy()))
}

#[instrument(skip_all)]
pub async fn run_dashboard(config: &Config, provider: &dyn CloudProvider) -> Result<u8> {
    let (config, report) = check_resources(config, provider).await?;
    let pipeline = pipeline_status(&config).await;

    let path = DashboardGenerator::from_config(&config)
        .generate(&report, &pipeline, Utc::now())
        .await?;
    println!("Dashboard written to {}", path.display());

    Ok(exit_for(report.is_healthy()))
}

#[instrument(skip_all)]
pub async fn run_alert(config: &Config, provider: &dyn CloudProvider) -> Result<u8> {
    let (config, report) = check_resources(config, provider).await?;
    let summary = AlertEvaluator::new(config.monthly_budget_usd, ESTIMATE).evaluate(&report);

    println!("{}", summary.render());

    if !summary.passed() {
        let message = summary.alert_message(config.account_id.as_deref(), &config.region);
        warn!("{}", message);
        if let Err(e) = log_alert(&config.scratch_dir, &summary, &message).await {
            error!("Could not write alert log: {}", e);
        }
    }

    Ok(summary.exit_code())
}

#[instrument(skip_all)]
pub async fn run_deploy(config: &Config, provider: &dyn CloudProvider) -> Result<u8> {
    if !tokio::fs::try_exists(&config.template_path).await? {
        return Err(MonitorError::ConfigurationMissing(format!(
            "stack template at {}",
            config.template_path.display()
        )));
    }

    let config = resolve_account(config, provider).await?;
    let request = StackRequest::from_config(&config)?;
    info!(
        "Deploying {} to {} with bucket {}",
        request.stack_name,
        config.region,
        config.bucket_name()?
    );

    let outcome = Deployer::new(provider)
        .deploy(&request, &config.function_name)
        .await?;

    println!("Stack: {}", outcome.stack);
    for (key, value) in &outcome.stack.outputs {
        println!("   {}: {}", key, value);
    }
    match &outcome.smoke_test {
        SmokeTest::Passed(payload) => println!("Smoke test passed: {}", payload),
        SmokeTest::Failed(reason) => println!("Smoke test failed: {}", reason),
    }

    if outcome.has_warnings() {
        println!("Deployment completed with warnings");
    } else {
        println!("Deployment completed successfully");
    }
    Ok(EXIT_OK)
}

/// `preset` wins over `input`; only the exact confirmation word is accepted
pub async fn confirm_cleanup<R>(preset: Option<&str>, input: &mut R) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    if let Some(answer) = preset {
        return Ok(answer.trim() == CLEANUP_CONFIRMATION);
    }

    print!(
        "This deletes every deployed resource and all stored data. Type {} to continue: ",
        CLEANUP_CONFIRMATION
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer).await?;
    Ok(answer.trim() == CLEANUP_CONFIRMATION)
}

#[instrument(skip_all)]
pub async fn run_cleanup<R>(config: &Config, provider: &dyn CloudProvider, input: &mut R) -> Result<u8>
where
    R: AsyncBufRead + Unpin,
{
    let config = resolve_account(config, provider).await?;
    let bucket = config.bucket_name()?;

    println!("Cleanup targets:");
    println!("   Stack: {}", config.stack_name);
    for resource in config.expected_resources()? {
        println!("   {}: {}", resource.kind.label(), resource.name);
    }

    if !confirm_cleanup(config.cleanup_confirmation.as_deref(), input).await? {
        println!("Cleanup cancelled");
        info!("Cleanup of {} cancelled", config.stack_name);
        return Ok(EXIT_UNHEALTHY);
    }

    let report = Cleanup::new(provider, &config.scratch_dir, &config.dashboard_path)
        .run(&config.stack_name, &bucket)
        .await?;

    println!("Deleted {} objects from {}", report.objects_deleted, bucket);
    println!("Stack: {}", report.stack);
    for path in &report.scratch_files_removed {
        println!("Removed {}", path.display());
    }
    println!("Cleanup completed");

    Ok(EXIT_OK)
}
