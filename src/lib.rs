//! MLOps Deployment Monitor Library
//!
//! Deploys, inspects and tears down the serverless stock-prediction stack:
//! per-resource status checks, a static HTML dashboard, threshold alerts,
//! and stack deployment and cleanup through the provider's template engine.
//!
//! ```no_run
//! use mlops_monitor::{AwsCliProvider, Config, StatusChecker};
//!
//! # tokio_test::block_on(async {
//! let mut config = Config::from_env();
//! config.account_id = Some("123456789012".to_string());
//!
//! let provider = AwsCliProvider::from_config(&config);
//! let report = StatusChecker::new(&provider)
//!     .check(&config.expected_resources()?)
//!     .await;
//!
//! println!("{}", report.render());
//! # Ok::<(), mlops_monitor::MonitorError>(())
//! # }).unwrap();
//! ```

pub mod alert;
pub mod commands;
pub mod config;
pub mod cost;
pub mod dashboard;
pub mod deployer;
pub mod errors;
pub mod github;
pub mod provider;
pub mod resource;
pub mod schedule;
pub mod status;

pub use alert::{AlertEvaluator, AlertSummary};
pub use config::Config;
pub use dashboard::DashboardGenerator;
pub use deployer::{Cleanup, Deployer};
pub use errors::{MonitorError, ProviderError, Result};
pub use provider::{AwsCliProvider, CloudProvider};
pub use resource::{ObservedStatus, ResourceId, ResourceKind, ResourceStatus};
pub use status::{StatusChecker, StatusReport};
