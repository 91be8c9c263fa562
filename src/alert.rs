//! Pass/fail evaluation of a status report against fixed thresholds

use crate::cost::{format_usd, CostEstimate};
use crate::errors::Result;
use crate::resource::ResourceId;
use crate::schedule::DEPLOYMENT;
use crate::status::StatusReport;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceVerdict {
    pub resource: ResourceId,
    pub passed: bool,
    pub observed: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetVerdict {
    pub monthly_estimate_usd: f64,
    pub monthly_budget_usd: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSummary {
    pub evaluated_at: DateTime<Utc>,
    pub resources: Vec<ResourceVerdict>,
    pub budget: BudgetVerdict,
}

impl AlertSummary {
    pub fn passed(&self) -> bool {
        self.budget.passed && self.resources.iter().all(|v| v.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceVerdict> {
        self.resources.iter().filter(|v| !v.passed)
    }

    /// Process exit code: 0 when everything passed
    pub fn exit_code(&self) -> u8 {
        if self.passed() { 0 } else { 1 }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("ALERT SYSTEM CHECK\n");
        out.push_str(&"=".repeat(40));
        out.push('\n');

        for verdict in &self.resources {
            out.push_str(&format!(
                "{} {}: {} ({})\n",
                if verdict.passed { "PASS" } else { "FAIL" },
                verdict.resource.kind.label(),
                verdict.resource.name,
                verdict.observed
            ));
        }

        out.push_str(&format!(
            "{} Monthly cost: {} (budget {})\n",
            if self.budget.passed { "PASS" } else { "FAIL" },
            format_usd(self.budget.monthly_estimate_usd),
            format_usd(self.budget.monthly_budget_usd)
        ));

        if self.passed() {
            out.push_str("\nAll systems healthy - no alerts needed\n");
        } else {
            out.push_str("\nSystem status: NEEDS ATTENTION\n");
        }
        out
    }

    /// First line of the alert, naming what failed
    pub fn headline(&self) -> &'static str {
        match (self.failures().next().is_some(), self.budget.passed) {
            (true, false) => "MLOps ALERT: Resources Missing, Budget Exceeded",
            (true, true) => "MLOps ALERT: Resources Missing",
            (false, false) => "MLOps ALERT: Budget Exceeded",
            (false, true) => "MLOps: All Checks Passed",
        }
    }

    /// Alert text recorded when the check fails
    pub fn alert_message(&self, account: Option<&str>, region: &str) -> String {
        let mut message = String::new();
        message.push_str(self.headline());
        message.push_str("\n\n");
        message.push_str(&format!(
            "Time: {}\n",
            self.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        message.push_str(&format!("Account: {}\n", account.unwrap_or("unknown")));
        message.push_str(&format!("Region: {}\n\n", region));

        message.push_str("Failing checks:\n");
        for verdict in self.failures() {
            message.push_str(&format!(
                "   - {} {} ({})\n",
                verdict.resource.kind.label(),
                verdict.resource.name,
                verdict.observed
            ));
        }
        if !self.budget.passed {
            message.push_str(&format!(
                "   - Monthly cost {} exceeds budget {}\n",
                format_usd(self.budget.monthly_estimate_usd),
                format_usd(self.budget.monthly_budget_usd)
            ));
        }

        message.push_str(&format!(
            "\nResolution:\n   - The CI pipeline redeploys the stack daily at {} ({})\n   - Manual deployment: mlops_monitor deploy\n",
            DEPLOYMENT.utc_label(),
            DEPLOYMENT.local_hint
        ));
        message
    }
}

pub struct AlertEvaluator {
    monthly_budget_usd: f64,
    cost: CostEstimate,
}

impl AlertEvaluator {
    pub fn new(monthly_budget_usd: f64, cost: CostEstimate) -> Self {
        Self {
            monthly_budget_usd,
            cost,
        }
    }

    /// Absent or erroring resources fail, as does an estimate above budget
    pub fn evaluate(&self, report: &StatusReport) -> AlertSummary {
        let resources = report
            .entries
            .iter()
            .map(|entry| ResourceVerdict {
                resource: entry.resource.clone(),
                passed: entry.is_healthy(),
                observed: entry.observed.to_string(),
            })
            .collect();

        let budget = BudgetVerdict {
            monthly_estimate_usd: self.cost.monthly_usd,
            monthly_budget_usd: self.monthly_budget_usd,
            passed: self.cost.within(self.monthly_budget_usd),
        };

        let summary = AlertSummary {
            evaluated_at: report.checked_at,
            resources,
            budget,
        };

        if summary.passed() {
            info!("Alert check passed for run {}", report.run_id);
        } else {
            let failing: Vec<String> = summary.failures().map(|v| v.resource.to_string()).collect();
            warn!(
                "ALERT: run {} failed checks [{}], budget ok: {}",
                report.run_id,
                failing.join(", "),
                summary.budget.passed
            );
        }

        summary
    }
}

/// Write `alert_<timestamp>.log` into `dir`
pub async fn log_alert(dir: &Path, summary: &AlertSummary, message: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!(
        "alert_{}.log",
        summary.evaluated_at.format("%Y%m%d_%H%M%S")
    ));
    tokio::fs::write(&path, message).await?;
    info!("Alert logged to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::ESTIMATE;
    use crate::resource::{ObservedStatus, ResourceStatus};

    fn report(function: ObservedStatus, rule: ObservedStatus) -> StatusReport {
        StatusReport::new(vec![
            ResourceStatus::new(ResourceId::bucket("mlops-stock-data"), ObservedStatus::Present),
            ResourceStatus::new(ResourceId::function("stock-data-collector"), function),
            ResourceStatus::new(ResourceId::rule("daily-stock-collection"), rule),
        ])
    }

    #[test]
    fn test_all_present_exits_zero() {
        let summary = AlertEvaluator::new(1.0, ESTIMATE)
            .evaluate(&report(ObservedStatus::Present, ObservedStatus::Present));

        assert!(summary.passed());
        assert_eq!(summary.exit_code(), 0);
        assert!(summary.render().contains("no alerts needed"));
    }

    #[test]
    fn test_absent_rule_fails_alone() {
        let summary = AlertEvaluator::new(1.0, ESTIMATE)
            .evaluate(&report(ObservedStatus::Present, ObservedStatus::Absent));

        assert!(!summary.passed());
        assert_eq!(summary.exit_code(), 1);

        let failing: Vec<&str> = summary.failures().map(|v| v.resource.name.as_str()).collect();
        assert_eq!(failing, vec!["daily-stock-collection"]);

        let rendered = summary.render();
        assert!(rendered.contains("PASS S3 Bucket: mlops-stock-data (present)"));
        assert!(rendered.contains("PASS Lambda Function: stock-data-collector (present)"));
        assert!(rendered.contains("FAIL EventBridge Rule: daily-stock-collection (absent)"));
    }

    #[test]
    fn test_error_status_fails() {
        let summary = AlertEvaluator::new(1.0, ESTIMATE).evaluate(&report(
            ObservedStatus::Error("timeout".to_string()),
            ObservedStatus::Present,
        ));

        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.failures().count(), 1);
        assert_eq!(summary.failures().next().unwrap().observed, "error: timeout");
    }

    #[test]
    fn test_budget_ceiling() {
        let summary = AlertEvaluator::new(0.0001, ESTIMATE)
            .evaluate(&report(ObservedStatus::Present, ObservedStatus::Present));

        assert!(!summary.budget.passed);
        assert_eq!(summary.failures().count(), 0);
        assert_eq!(summary.exit_code(), 1);
        let message = summary.alert_message(None, "us-east-1");
        assert!(message.starts_with("MLOps ALERT: Budget Exceeded\n"));
        assert!(!message.contains("Resources Missing"));
        assert!(message.contains("Monthly cost ~$0.00012 exceeds budget ~$0.0001"));
    }

    #[test]
    fn test_alert_message_lists_failures() {
        let summary = AlertEvaluator::new(1.0, ESTIMATE)
            .evaluate(&report(ObservedStatus::Absent, ObservedStatus::Absent));
        let message = summary.alert_message(Some("123456789012"), "us-east-1");

        assert!(message.starts_with("MLOps ALERT: Resources Missing\n"));
        assert!(message.contains("Account: 123456789012"));
        assert!(message.contains("Lambda Function stock-data-collector (absent)"));
        assert!(message.contains("EventBridge Rule daily-stock-collection (absent)"));
        assert!(!message.contains("S3 Bucket"));
        assert!(message.contains("00:00 UTC (8 AM Singapore)"));
    }

    #[test]
    fn test_headline_names_every_failed_check() {
        let both = AlertEvaluator::new(0.0, ESTIMATE)
            .evaluate(&report(ObservedStatus::Absent, ObservedStatus::Present));
        assert_eq!(both.headline(), "MLOps ALERT: Resources Missing, Budget Exceeded");

        let healthy = AlertEvaluator::new(1.0, ESTIMATE)
            .evaluate(&report(ObservedStatus::Present, ObservedStatus::Present));
        assert_eq!(healthy.headline(), "MLOps: All Checks Passed");
    }

    #[tokio::test]
    async fn test_log_alert_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let summary = AlertEvaluator::new(1.0, ESTIMATE)
            .evaluate(&report(ObservedStatus::Absent, ObservedStatus::Present));

        let path = log_alert(dir.path(), &summary, "body").await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("alert_") && name.ends_with(".log"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "body");
    }
}
