//! Resource identifiers and observed status values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Bucket,
    Function,
    Rule,
}

impl ResourceKind {
    /// Label shown on reports and the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Bucket => "S3 Bucket",
            ResourceKind::Function => "Lambda Function",
            ResourceKind::Rule => "EventBridge Rule",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Bucket => write!(f, "bucket"),
            ResourceKind::Function => write!(f, "function"),
            ResourceKind::Rule => write!(f, "rule"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn bucket(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Bucket, name)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Function, name)
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Rule, name)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ObservedStatus {
    Present,
    Absent,
    Error(String),
}

impl std::fmt::Display for ObservedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservedStatus::Present => write!(f, "present"),
            ObservedStatus::Absent => write!(f, "absent"),
            ObservedStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Extra facts reported by a successful lookup, in display order
pub type ResourceDetails = Vec<(String, String)>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResourceStatus {
    pub resource: ResourceId,
    pub expected: bool,
    pub observed: ObservedStatus,
    pub last_checked: DateTime<Utc>,
    pub details: ResourceDetails,
}

impl ResourceStatus {
    pub fn new(resource: ResourceId, observed: ObservedStatus) -> Self {
        Self {
            resource,
            expected: true,
            observed,
            last_checked: Utc::now(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: ResourceDetails) -> Self {
        self.details = details;
        self
    }

    /// Expected resources must be present; unexpected ones must not be
    pub fn is_healthy(&self) -> bool {
        match &self.observed {
            ObservedStatus::Present => self.expected,
            ObservedStatus::Absent => !self.expected,
            ObservedStatus::Error(_) => false,
        }
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_status_display() {
        assert_eq!(ObservedStatus::Present.to_string(), "present");
        assert_eq!(ObservedStatus::Absent.to_string(), "absent");
        assert_eq!(
            ObservedStatus::Error("timeout".to_string()).to_string(),
            "error: timeout"
        );
    }

    #[test]
    fn test_health_follows_expectation() {
        let present = ResourceStatus::new(ResourceId::bucket("b"), ObservedStatus::Present);
        assert!(present.is_healthy());

        let mut gone = ResourceStatus::new(ResourceId::bucket("b"), ObservedStatus::Absent);
        assert!(!gone.is_healthy());
        gone.expected = false;
        assert!(gone.is_healthy());

        let failed = ResourceStatus::new(
            ResourceId::rule("r"),
            ObservedStatus::Error("access denied".to_string()),
        );
        assert!(!failed.is_healthy());
    }

    #[test]
    fn test_detail_lookup() {
        let status = ResourceStatus::new(ResourceId::function("f"), ObservedStatus::Present)
            .with_details(vec![("State".to_string(), "Active".to_string())]);

        assert_eq!(status.detail("State"), Some("Active"));
        assert_eq!(status.detail("Runtime"), None);
    }

    #[test]
    fn test_status_serializes_tagged() {
        let json = serde_json::to_value(ObservedStatus::Error("timeout".to_string())).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "timeout");
    }
}
