//! In-memory provider used by the test suites

use super::{
    CloudProvider, Invocation, StackReport, StackRequest, PARAM_BUCKET, PARAM_FUNCTION, PARAM_RULE,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::resource::{ResourceDetails, ResourceId, ResourceKind};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    account: Option<String>,
    buckets: BTreeMap<String, usize>,
    functions: BTreeSet<String>,
    rules: BTreeSet<String>,
    stacks: BTreeMap<String, (StackReport, Vec<ResourceId>)>,
    failures: HashMap<ResourceId, ProviderError>,
    deploy_failure: Option<String>,
    invoke_failure: Option<String>,
    empty_failure: Option<ProviderError>,
    delete_outcome: Option<StackReport>,
    calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    state: Mutex<State>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account: &str) -> Self {
        self.state.lock().unwrap().account = Some(account.to_string());
        self
    }

    /// Create a resource outside of any stack
    pub fn with_resource(self, resource: ResourceId) -> Self {
        self.insert(&resource);
        self
    }

    pub fn with_objects(self, bucket: &str, count: usize) -> Self {
        self.state.lock().unwrap().buckets.insert(bucket.to_string(), count);
        self
    }

    /// Make every lookup of `resource` fail with `error`
    pub fn failing(self, resource: ResourceId, error: ProviderError) -> Self {
        self.state.lock().unwrap().failures.insert(resource, error);
        self
    }

    /// Make the next deployment roll back with `reason`
    pub fn failing_deploy(self, reason: &str) -> Self {
        self.state.lock().unwrap().deploy_failure = Some(reason.to_string());
        self
    }

    pub fn failing_invoke(self, reason: &str) -> Self {
        self.state.lock().unwrap().invoke_failure = Some(reason.to_string());
        self
    }

    /// Make emptying any bucket fail with `error`
    pub fn failing_empty(self, error: ProviderError) -> Self {
        self.state.lock().unwrap().empty_failure = Some(error);
        self
    }

    /// Make stack deletion stop in `status` without removing anything
    pub fn stuck_delete(self, status: &str, reason: &str) -> Self {
        self.state.lock().unwrap().delete_outcome =
            Some(StackReport::new("", status).with_reason(reason));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn exists(&self, resource: &ResourceId) -> bool {
        let state = self.state.lock().unwrap();
        match resource.kind {
            ResourceKind::Bucket => state.buckets.contains_key(&resource.name),
            ResourceKind::Function => state.functions.contains(&resource.name),
            ResourceKind::Rule => state.rules.contains(&resource.name),
        }
    }

    fn insert(&self, resource: &ResourceId) {
        let mut state = self.state.lock().unwrap();
        match resource.kind {
            ResourceKind::Bucket => {
                state.buckets.entry(resource.name.clone()).or_insert(0);
            }
            ResourceKind::Function => {
                state.functions.insert(resource.name.clone());
            }
            ResourceKind::Rule => {
                state.rules.insert(resource.name.clone());
            }
        }
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn stack_resources(request: &StackRequest) -> Vec<ResourceId> {
    let mut resources = Vec::new();
    if let Some(bucket) = request.parameters.get(PARAM_BUCKET) {
        resources.push(ResourceId::bucket(bucket));
    }
    if let Some(function) = request.parameters.get(PARAM_FUNCTION) {
        resources.push(ResourceId::function(function));
    }
    if let Some(rule) = request.parameters.get(PARAM_RULE) {
        resources.push(ResourceId::rule(rule));
    }
    resources
}

#[async_trait]
impl CloudProvider for InMemoryProvider {
    async fn caller_account(&self) -> ProviderResult<String> {
        self.record("caller_account".to_string());
        self.state
            .lock()
            .unwrap()
            .account
            .clone()
            .ok_or_else(|| ProviderError::AccessDenied("Unable to locate credentials".to_string()))
    }

    async fn probe(&self, resource: &ResourceId) -> ProviderResult<ResourceDetails> {
        self.record(format!("probe {}", resource));

        if let Some(err) = self.state.lock().unwrap().failures.get(resource) {
            return Err(err.clone());
        }

        if !self.exists(resource) {
            return Err(ProviderError::NotFound(resource.name.clone()));
        }

        let details = match resource.kind {
            ResourceKind::Bucket => {
                let files = self.state.lock().unwrap().buckets[&resource.name];
                vec![("Files".to_string(), files.to_string())]
            }
            ResourceKind::Function => vec![("State".to_string(), "Active".to_string())],
            ResourceKind::Rule => vec![("Schedule".to_string(), "cron(0 9 * * ? *)".to_string())],
        };
        Ok(details)
    }

    async fn deploy_stack(&self, request: &StackRequest) -> ProviderResult<StackReport> {
        self.record(format!("deploy_stack {}", request.stack_name));

        let resources = stack_resources(request);
        let failure = self.state.lock().unwrap().deploy_failure.take();

        if let Some(reason) = failure {
            let report = StackReport::new(&request.stack_name, "ROLLBACK_COMPLETE").with_reason(&reason);
            self.state
                .lock()
                .unwrap()
                .stacks
                .insert(request.stack_name.clone(), (report, Vec::new()));
            return Err(ProviderError::Failed(format!(
                "Failed to create/update the stack {}: {}",
                request.stack_name, reason
            )));
        }

        for resource in &resources {
            self.insert(resource);
        }

        let mut state = self.state.lock().unwrap();
        let status = if state.stacks.contains_key(&request.stack_name) {
            "UPDATE_COMPLETE"
        } else {
            "CREATE_COMPLETE"
        };
        let mut report = StackReport::new(&request.stack_name, status);
        if let Some(function) = request.parameters.get(PARAM_FUNCTION) {
            report.outputs.insert(
                "FunctionArn".to_string(),
                format!("arn:aws:lambda:us-east-1:000000000000:function:{}", function),
            );
        }
        state
            .stacks
            .insert(request.stack_name.clone(), (report.clone(), resources));

        Ok(report)
    }

    async fn describe_stack(&self, stack_name: &str) -> ProviderResult<StackReport> {
        self.record(format!("describe_stack {}", stack_name));
        self.state
            .lock()
            .unwrap()
            .stacks
            .get(stack_name)
            .map(|(report, _)| report.clone())
            .ok_or_else(|| ProviderError::NotFound(stack_name.to_string()))
    }

    async fn delete_stack(&self, stack_name: &str) -> ProviderResult<StackReport> {
        self.record(format!("delete_stack {}", stack_name));

        let mut state = self.state.lock().unwrap();
        if let Some(outcome) = state.delete_outcome.clone() {
            return Ok(StackReport {
                stack_name: stack_name.to_string(),
                ..outcome
            });
        }

        let Some((_, resources)) = state.stacks.get(stack_name).cloned() else {
            return Ok(StackReport::new(stack_name, "DELETE_COMPLETE"));
        };

        let non_empty = resources.iter().find(|r| {
            r.kind == ResourceKind::Bucket && state.buckets.get(&r.name).copied().unwrap_or(0) > 0
        });
        if let Some(bucket) = non_empty {
            let report = StackReport::new(stack_name, "DELETE_FAILED")
                .with_reason(format!("The bucket you tried to delete is not empty: {}", bucket.name));
            state
                .stacks
                .insert(stack_name.to_string(), (report.clone(), resources));
            return Ok(report);
        }

        for resource in &resources {
            match resource.kind {
                ResourceKind::Bucket => {
                    state.buckets.remove(&resource.name);
                }
                ResourceKind::Function => {
                    state.functions.remove(&resource.name);
                }
                ResourceKind::Rule => {
                    state.rules.remove(&resource.name);
                }
            }
        }
        state.stacks.remove(stack_name);

        Ok(StackReport::new(stack_name, "DELETE_COMPLETE"))
    }

    async fn empty_bucket(&self, bucket: &str) -> ProviderResult<usize> {
        self.record(format!("empty_bucket {}", bucket));
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.empty_failure.clone() {
            return Err(err);
        }
        match state.buckets.get_mut(bucket) {
            Some(count) => Ok(std::mem::take(count)),
            None => Err(ProviderError::NotFound(bucket.to_string())),
        }
    }

    async fn invoke_function(&self, function: &str, payload: &Value) -> ProviderResult<Invocation> {
        self.record(format!("invoke_function {}", function));

        if let Some(reason) = self.state.lock().unwrap().invoke_failure.clone() {
            return Ok(Invocation {
                status_code: 200,
                function_error: Some("Unhandled".to_string()),
                payload: json!({ "errorMessage": reason }),
            });
        }

        if !self.exists(&ResourceId::function(function)) {
            return Err(ProviderError::NotFound(function.to_string()));
        }

        let symbols = payload["symbols"].as_array().map(Vec::len).unwrap_or(0);
        Ok(Invocation {
            status_code: 200,
            function_error: None,
            payload: json!({
                "statusCode": 200,
                "body": format!("Successfully processed {} symbols", symbols),
            }),
        })
    }
}
