//! Resource status checks and the per-run status report

use crate::errors::Result;
use crate::provider::CloudProvider;
use crate::resource::{ObservedStatus, ResourceId, ResourceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of one status check run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub run_id: Uuid,
    pub checked_at: DateTime<Utc>,
    pub entries: Vec<ResourceStatus>,
}

impl StatusReport {
    pub fn new(entries: Vec<ResourceStatus>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            checked_at: Utc::now(),
            entries,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResourceStatus> {
        self.entries.iter().find(|e| e.resource.name == name)
    }

    /// Identifier → observed status
    pub fn as_map(&self) -> BTreeMap<&ResourceId, &ObservedStatus> {
        self.entries
            .iter()
            .map(|e| (&e.resource, &e.observed))
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.entries.iter().all(ResourceStatus::is_healthy)
    }

    pub fn unhealthy(&self) -> impl Iterator<Item = &ResourceStatus> {
        self.entries.iter().filter(|e| !e.is_healthy())
    }

    /// Human-readable lines for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("AWS RESOURCES STATUS\n");
        out.push_str(&"=".repeat(50));
        out.push('\n');

        for entry in &self.entries {
            let marker = if entry.is_healthy() { "OK  " } else { "FAIL" };
            out.push_str(&format!(
                "[{}] {}: {} ({})\n",
                marker,
                entry.resource.kind.label(),
                entry.resource.name,
                entry.observed
            ));
            for (key, value) in &entry.details {
                out.push_str(&format!("       {}: {}\n", key, value));
            }
        }

        out.push_str(&format!(
            "\nChecked at {}\n",
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out
    }

    /// Persist as `monitoring_status_<timestamp>.json` inside `dir`
    pub async fn write_snapshot(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!(
            "monitoring_status_{}.json",
            self.checked_at.format("%Y%m%d_%H%M%S")
        ));
        let body = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&path, body).await?;
        debug!("Status snapshot written to {}", path.display());
        Ok(path)
    }
}

/// Queries each expected resource in turn
pub struct StatusChecker<'a> {
    provider: &'a dyn CloudProvider,
}

impl<'a> StatusChecker<'a> {
    pub fn new(provider: &'a dyn CloudProvider) -> Self {
        Self { provider }
    }

    /// Check every distinct identifier; one failed lookup never stops the rest
    #[instrument(skip_all, fields(resources = expected.len()))]
    pub async fn check(&self, expected: &[ResourceId]) -> StatusReport {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(expected.len());

        for resource in expected {
            if !seen.insert(resource) {
                debug!("Skipping duplicate identifier {}", resource);
                continue;
            }
            entries.push(self.check_one(resource).await);
        }

        let report = StatusReport::new(entries);
        info!(
            "Status check {} finished: {} of {} resources healthy",
            report.run_id,
            report.entries.iter().filter(|e| e.is_healthy()).count(),
            report.entries.len()
        );
        report
    }

    async fn check_one(&self, resource: &ResourceId) -> ResourceStatus {
        match self.provider.probe(resource).await {
            Ok(details) => {
                debug!("{} is present", resource);
                ResourceStatus::new(resource.clone(), ObservedStatus::Present).with_details(details)
            }
            Err(e) if e.is_not_found() => {
                warn!("{} is absent", resource);
                ResourceStatus::new(resource.clone(), ObservedStatus::Absent)
            }
            Err(e) => {
                warn!("Lookup of {} failed: {}", resource, e);
                ResourceStatus::new(resource.clone(), ObservedStatus::Error(e.status_message()))
            }
        }
    }
}
