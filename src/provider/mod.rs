//! Cloud provider access
//!
//! Everything the tool needs from the provider goes through [`CloudProvider`]:
//! resource lookups for the status checker and the stack operations used by
//! deploy and cleanup. The production implementation drives the `aws` CLI.

pub mod aws_cli;
pub mod command;
#[cfg(test)]
pub mod memory;

use crate::config::Config;
use crate::errors::{ProviderResult, Result};
use crate::resource::{ResourceDetails, ResourceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use aws_cli::AwsCliProvider;
pub use command::{CommandOutput, CommandRunner, TokioCommandRunner};

pub const PARAM_BUCKET: &str = "BucketName";
pub const PARAM_FUNCTION: &str = "FunctionName";
pub const PARAM_RULE: &str = "RuleName";
pub const PARAM_SCHEDULE: &str = "ScheduleExpression";

#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Account the provider credentials belong to
    async fn caller_account(&self) -> ProviderResult<String>;

    /// Look up a resource. `ProviderError::NotFound` means it does not exist.
    async fn probe(&self, resource: &ResourceId) -> ProviderResult<ResourceDetails>;

    /// Create or update a stack and wait for the operation to finish
    async fn deploy_stack(&self, request: &StackRequest) -> ProviderResult<StackReport>;

    async fn describe_stack(&self, stack_name: &str) -> ProviderResult<StackReport>;

    /// Delete a stack and wait for the deletion to finish
    async fn delete_stack(&self, stack_name: &str) -> ProviderResult<StackReport>;

    /// Remove every object from a bucket, returning how many were deleted
    async fn empty_bucket(&self, bucket: &str) -> ProviderResult<usize>;

    /// Synchronously invoke a function with a JSON payload
    async fn invoke_function(&self, function: &str, payload: &Value) -> ProviderResult<Invocation>;
}

/// Parameters for a stack deployment
#[derive(Debug, Clone, PartialEq)]
pub struct StackRequest {
    pub stack_name: String,
    pub template_path: PathBuf,
    pub parameters: BTreeMap<String, String>,
}

impl StackRequest {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut parameters = BTreeMap::new();
        parameters.insert(PARAM_BUCKET.to_string(), config.bucket_name()?);
        parameters.insert(PARAM_FUNCTION.to_string(), config.function_name.clone());
        parameters.insert(PARAM_RULE.to_string(), config.rule_name.clone());
        parameters.insert(PARAM_SCHEDULE.to_string(), config.collection_schedule.clone());

        Ok(Self {
            stack_name: config.stack_name.clone(),
            template_path: config.template_path.clone(),
            parameters,
        })
    }

    /// `Key=Value` pairs in the form the template engine expects
    pub fn parameter_overrides(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

/// Final state of a stack as reported by the template engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackReport {
    pub stack_name: String,
    pub status: String,
    pub reason: Option<String>,
    pub outputs: BTreeMap<String, String>,
}

impl StackReport {
    pub fn new(stack_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            status: status.into(),
            reason: None,
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Failed operations and rollbacks, including completed rollbacks
    pub fn is_failed(&self) -> bool {
        self.status.ends_with("_FAILED") || self.status.contains("ROLLBACK")
    }

    pub fn is_complete(&self) -> bool {
        self.status.ends_with("_COMPLETE") && !self.is_failed()
    }

    /// No further transition will happen without a new operation
    pub fn is_terminal(&self) -> bool {
        self.status.ends_with("_COMPLETE") || self.status.ends_with("_FAILED")
    }

    pub fn is_deleted(&self) -> bool {
        self.status == "DELETE_COMPLETE"
    }
}

impl std::fmt::Display for StackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.stack_name, self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

/// Result of a synchronous function invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub status_code: i64,
    pub function_error: Option<String>,
    pub payload: Value,
}

impl Invocation {
    pub fn succeeded(&self) -> bool {
        (200..300).contains(&self.status_code) && self.function_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_status_classification() {
        assert!(StackReport::new("s", "CREATE_COMPLETE").is_complete());
        assert!(StackReport::new("s", "UPDATE_COMPLETE").is_complete());
        assert!(StackReport::new("s", "ROLLBACK_COMPLETE").is_failed());
        assert!(StackReport::new("s", "UPDATE_ROLLBACK_COMPLETE").is_failed());
        assert!(StackReport::new("s", "DELETE_FAILED").is_failed());
        assert!(!StackReport::new("s", "CREATE_IN_PROGRESS").is_complete());
        assert!(!StackReport::new("s", "CREATE_IN_PROGRESS").is_failed());
        assert!(StackReport::new("s", "ROLLBACK_COMPLETE").is_terminal());
        assert!(StackReport::new("s", "DELETE_FAILED").is_terminal());
        assert!(!StackReport::new("s", "DELETE_IN_PROGRESS").is_terminal());
        assert!(!StackReport::new("s", "UPDATE_ROLLBACK_IN_PROGRESS").is_terminal());
        assert!(StackReport::new("s", "DELETE_COMPLETE").is_deleted());
        assert!(!StackReport::new("s", "DELETE_FAILED").is_deleted());
    }

    #[test]
    fn test_request_from_config() {
        let mut config = Config::default();
        config.bucket_name = Some("data-bucket".to_string());

        let request = StackRequest::from_config(&config).unwrap();
        assert_eq!(request.stack_name, "mlops-stock-prediction");
        assert_eq!(
            request.parameter_overrides(),
            vec![
                "BucketName=data-bucket".to_string(),
                "FunctionName=stock-data-collector".to_string(),
                "RuleName=daily-stock-collection".to_string(),
                "ScheduleExpression=cron(0 9 * * ? *)".to_string(),
            ]
        );
    }

    #[test]
    fn test_invocation_success() {
        let ok = Invocation {
            status_code: 200,
            function_error: None,
            payload: Value::Null,
        };
        assert!(ok.succeeded());

        let unhandled = Invocation {
            function_error: Some("Unhandled".to_string()),
            ..ok
        };
        assert!(!unhandled.succeeded());
    }
}
