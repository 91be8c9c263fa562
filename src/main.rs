//! MLOps Deployment Monitor Binary

use clap::{Parser, Subcommand};
use mlops_monitor::commands::{self, EXIT_UNHEALTHY};
use mlops_monitor::{AwsCliProvider, Config};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "mlops_monitor", version, about = "Deploy and monitor the MLOps stock-prediction stack")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Create or update the stack and smoke-test the collector
    Deploy,
    /// Print the status of every expected resource
    Status,
    /// Write the HTML dashboard
    Dashboard,
    /// Evaluate resources and cost against alert thresholds
    Alert,
    /// Delete the stack, its data and local scratch files
    Cleanup,
}

impl Command {
    fn name(self) -> &'static str {
        match self {
            Command::Deploy => "deploy",
            Command::Status => "status",
            Command::Dashboard => "dashboard",
            Command::Alert => "alert",
            Command::Cleanup => "cleanup",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    initialize_tracing();

    info!("Starting MLOps monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("{}", e);
        return ExitCode::from(EXIT_UNHEALTHY);
    }

    info!(
        "Monitor configuration - Region: {}, Stack: {}, Function: {}, Rule: {}",
        config.region, config.stack_name, config.function_name, config.rule_name
    );

    // Run the requested command against the aws CLI
    let provider = AwsCliProvider::from_config(&config);

    let result = match cli.command {
        Command::Deploy => commands::run_deploy(&config, &provider).await,
        Command::Status => commands::run_status(&config, &provider).await,
        Command::Dashboard => commands::run_dashboard(&config, &provider).await,
        Command::Alert => commands::run_alert(&config, &provider).await,
        Command::Cleanup => {
            let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
            commands::run_cleanup(&config, &provider, &mut stdin).await
        }
    };

    ExitCode::from(commands::exit_code(cli.command.name(), result))
}

/// Initialize structured logging on stderr
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
