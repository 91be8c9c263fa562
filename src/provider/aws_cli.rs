//! `CloudProvider` backed by the `aws` command-line client

use super::command::{CommandOutput, CommandRunner, TokioCommandRunner};
use super::{CloudProvider, Invocation, StackReport, StackRequest};
use crate::config::Config;
use crate::errors::{ProviderError, ProviderResult};
use crate::resource::{ResourceDetails, ResourceId, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AwsCliProvider<R = TokioCommandRunner> {
    runner: R,
    cli: String,
    region: String,
    profile: Option<String>,
}

impl AwsCliProvider<TokioCommandRunner> {
    pub fn from_config(config: &Config) -> Self {
        Self::with_runner(
            TokioCommandRunner::new(config.command_timeout),
            config.aws_cli.clone(),
            config.region.clone(),
            config.aws_profile.clone(),
        )
    }
}

impl<R: CommandRunner> AwsCliProvider<R> {
    pub fn with_runner(runner: R, cli: String, region: String, profile: Option<String>) -> Self {
        Self {
            runner,
            cli,
            region,
            profile,
        }
    }

    fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut full: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        full.push("--region".to_string());
        full.push(self.region.clone());
        full.push("--output".to_string());
        full.push("json".to_string());
        if let Some(profile) = &self.profile {
            full.push("--profile".to_string());
            full.push(profile.clone());
        }
        full
    }

    /// Run one CLI call; `subject` names the object in not-found errors
    async fn call(&self, subject: &str, args: &[&str]) -> ProviderResult<String> {
        let output = self.runner.run(&self.cli, &self.command_args(args)).await?;

        if output.is_success() {
            return Ok(output.stdout);
        }

        let err = classify_failure(subject, &output);
        debug!("{} {} failed: {}", self.cli, args.join(" "), err);
        Err(err)
    }

    async fn call_json(&self, subject: &str, args: &[&str]) -> ProviderResult<Value> {
        let stdout = self.call(subject, args).await?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    async fn probe_bucket(&self, bucket: &str) -> ProviderResult<ResourceDetails> {
        self.call(bucket, &["s3api", "head-bucket", "--bucket", bucket])
            .await?;

        let mut details = ResourceDetails::new();
        match self
            .call_json(bucket, &["s3api", "list-objects-v2", "--bucket", bucket])
            .await
        {
            Ok(listing) => {
                let contents = listing["Contents"].as_array().cloned().unwrap_or_default();
                let total_bytes: u64 = contents.iter().filter_map(|o| o["Size"].as_u64()).sum();
                details.push(("Files".to_string(), contents.len().to_string()));
                details.push((
                    "Size".to_string(),
                    format!("{:.2} KB", total_bytes as f64 / 1024.0),
                ));
            }
            Err(e) => warn!("Bucket {} exists but listing failed: {}", bucket, e),
        }

        Ok(details)
    }

    async fn probe_function(&self, function: &str) -> ProviderResult<ResourceDetails> {
        let response = self
            .call_json(function, &["lambda", "get-function", "--function-name", function])
            .await?;

        let configuration = &response["Configuration"];
        let mut details = ResourceDetails::new();
        for (label, key) in [
            ("State", "State"),
            ("Runtime", "Runtime"),
            ("Memory", "MemorySize"),
            ("Last Modified", "LastModified"),
        ] {
            if let Some(value) = json_text(&configuration[key]) {
                let value = if key == "MemorySize" {
                    format!("{}MB", value)
                } else {
                    value
                };
                details.push((label.to_string(), value));
            }
        }

        match self.function_log_group(function).await {
            Ok(log_details) => details.extend(log_details),
            Err(e) => warn!("Function {} exists but log lookup failed: {}", function, e),
        }

        Ok(details)
    }

    /// Log group of a function and the time of its most recent event
    async fn function_log_group(&self, function: &str) -> ProviderResult<ResourceDetails> {
        let group_name = format!("/aws/lambda/{}", function);
        let response = self
            .call_json(
                &group_name,
                &["logs", "describe-log-groups", "--log-group-name-prefix", group_name.as_str()],
            )
            .await?;

        let groups = response["logGroups"].as_array().cloned().unwrap_or_default();
        let Some(group) = groups
            .iter()
            .find(|g| g["logGroupName"].as_str() == Some(group_name.as_str()))
        else {
            return Ok(ResourceDetails::new());
        };

        let mut details = vec![("Log Group".to_string(), group_name.clone())];
        if let Some(last_event) = group["lastEventTime"]
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
        {
            details.push((
                "Last Invocation".to_string(),
                last_event.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ));
        }
        Ok(details)
    }

    async fn probe_rule(&self, rule: &str) -> ProviderResult<ResourceDetails> {
        let response = self
            .call_json(rule, &["events", "describe-rule", "--name", rule])
            .await?;

        let mut details = ResourceDetails::new();
        if let Some(schedule) = json_text(&response["ScheduleExpression"]) {
            details.push(("Schedule".to_string(), schedule));
        }
        if let Some(state) = json_text(&response["State"]) {
            details.push(("State".to_string(), state));
        }

        Ok(details)
    }
}

#[async_trait]
impl<R: CommandRunner> CloudProvider for AwsCliProvider<R> {
    async fn caller_account(&self) -> ProviderResult<String> {
        let identity = self
            .call_json("caller identity", &["sts", "get-caller-identity"])
            .await?;

        identity["Account"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed("caller identity has no Account".to_string()))
    }

    async fn probe(&self, resource: &ResourceId) -> ProviderResult<ResourceDetails> {
        match resource.kind {
            ResourceKind::Bucket => self.probe_bucket(&resource.name).await,
            ResourceKind::Function => self.probe_function(&resource.name).await,
            ResourceKind::Rule => self.probe_rule(&resource.name).await,
        }
    }

    async fn deploy_stack(&self, request: &StackRequest) -> ProviderResult<StackReport> {
        let template = request.template_path.to_string_lossy().into_owned();
        let overrides = request.parameter_overrides();

        let mut args = vec![
            "cloudformation",
            "deploy",
            "--stack-name",
            request.stack_name.as_str(),
            "--template-file",
            template.as_str(),
            "--capabilities",
            "CAPABILITY_NAMED_IAM",
            "--no-fail-on-empty-changeset",
        ];
        if !overrides.is_empty() {
            args.push("--parameter-overrides");
            args.extend(overrides.iter().map(String::as_str));
        }

        info!("Deploying stack {} from {}", request.stack_name, template);
        self.call(&request.stack_name, &args).await?;

        self.describe_stack(&request.stack_name).await
    }

    async fn describe_stack(&self, stack_name: &str) -> ProviderResult<StackReport> {
        let response = self
            .call_json(
                stack_name,
                &["cloudformation", "describe-stacks", "--stack-name", stack_name],
            )
            .await?;

        parse_stack(stack_name, &response)
    }

    async fn delete_stack(&self, stack_name: &str) -> ProviderResult<StackReport> {
        self.call(
            stack_name,
            &["cloudformation", "delete-stack", "--stack-name", stack_name],
        )
        .await?;

        let waited = self
            .call(
                stack_name,
                &[
                    "cloudformation",
                    "wait",
                    "stack-delete-complete",
                    "--stack-name",
                    stack_name,
                ],
            )
            .await;

        match (self.describe_stack(stack_name).await, waited) {
            (Ok(report), Err(e)) if !report.is_terminal() => {
                warn!("Stack {} still {} after wait: {}", stack_name, report.status, e);
                Err(e)
            }
            (Ok(report), _) => Ok(report),
            (Err(ProviderError::NotFound(_)), _) => Ok(StackReport::new(stack_name, "DELETE_COMPLETE")),
            (Err(e), waited) => Err(waited.err().unwrap_or(e)),
        }
    }

    async fn empty_bucket(&self, bucket: &str) -> ProviderResult<usize> {
        let target = format!("s3://{}", bucket);
        let stdout = self
            .call(bucket, &["s3", "rm", target.as_str(), "--recursive"])
            .await?;

        Ok(stdout
            .lines()
            .filter(|line| line.trim_start().starts_with("delete:"))
            .count())
    }

    async fn invoke_function(&self, function: &str, payload: &Value) -> ProviderResult<Invocation> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let response_path = std::env::temp_dir().join(format!("mlops-invoke-{}.json", Uuid::new_v4()));
        let response_file = response_path.to_string_lossy().into_owned();

        let metadata = self
            .call_json(
                function,
                &[
                    "lambda",
                    "invoke",
                    "--function-name",
                    function,
                    "--cli-binary-format",
                    "raw-in-base64-out",
                    "--payload",
                    body.as_str(),
                    response_file.as_str(),
                ],
            )
            .await;

        let response = tokio::fs::read_to_string(&response_path).await;
        let _ = tokio::fs::remove_file(&response_path).await;
        let metadata = metadata?;

        let payload = match response {
            Ok(text) if !text.trim().is_empty() => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            _ => Value::Null,
        };

        Ok(Invocation {
            status_code: metadata["StatusCode"].as_i64().unwrap_or_default(),
            function_error: metadata["FunctionError"].as_str().map(str::to_string),
            payload,
        })
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_stack(stack_name: &str, response: &Value) -> ProviderResult<StackReport> {
    let stack = response["Stacks"]
        .as_array()
        .and_then(|stacks| stacks.first())
        .ok_or_else(|| ProviderError::NotFound(stack_name.to_string()))?;

    let status = stack["StackStatus"]
        .as_str()
        .ok_or_else(|| ProviderError::Malformed("stack has no StackStatus".to_string()))?;

    let mut report = StackReport::new(
        stack["StackName"].as_str().unwrap_or(stack_name),
        status,
    );
    report.reason = stack["StackStatusReason"].as_str().map(str::to_string);

    let mut outputs = BTreeMap::new();
    for output in stack["Outputs"].as_array().into_iter().flatten() {
        if let (Some(key), Some(value)) = (output["OutputKey"].as_str(), output["OutputValue"].as_str()) {
            outputs.insert(key.to_string(), value.to_string());
        }
    }
    report.outputs = outputs;

    Ok(report)
}

/// Map a failed CLI call onto the provider error taxonomy
fn classify_failure(subject: &str, output: &CommandOutput) -> ProviderError {
    let message = output
        .stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match output.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        });
    let lowered = output.stderr.to_lowercase();

    if lowered.contains("timed out") || lowered.contains("timeout on endpoint") {
        ProviderError::Timeout
    } else if lowered.contains("(404)")
        || lowered.contains("not found")
        || lowered.contains("notfound")
        || lowered.contains("nosuchbucket")
        || lowered.contains("does not exist")
    {
        ProviderError::NotFound(subject.to_string())
    } else if lowered.contains("accessdenied")
        || lowered.contains("(403)")
        || lowered.contains("forbidden")
        || lowered.contains("unauthorized")
        || lowered.contains("expiredtoken")
        || lowered.contains("unable to locate credentials")
    {
        ProviderError::AccessDenied(message)
    } else if lowered.contains("throttl")
        || lowered.contains("rate exceeded")
        || lowered.contains("toomanyrequests")
    {
        ProviderError::Throttled(message)
    } else {
        ProviderError::Failed(message)
    }
}
