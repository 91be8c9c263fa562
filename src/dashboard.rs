//! Static HTML status page

use crate::config::Config;
use crate::cost::{format_usd, CostEstimate, ESTIMATE};
use crate::errors::Result;
use crate::github::PipelineStatus;
use crate::resource::{ResourceKind, ResourceStatus};
use crate::schedule::{format_countdown, DAILY_EVENTS};
use crate::status::StatusReport;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; margin: 0; padding: 20px; min-height: 100vh; }
        .dashboard { max-width: 1200px; margin: 0 auto; background: rgba(255,255,255,0.1); border-radius: 20px; padding: 30px; border: 1px solid rgba(255,255,255,0.2); }
        .header { text-align: center; margin-bottom: 30px; border-bottom: 2px solid rgba(255,255,255,0.3); padding-bottom: 20px; }
        .status-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 20px; margin-bottom: 30px; }
        .status-card { background: rgba(255,255,255,0.1); border-radius: 15px; padding: 20px; border: 1px solid rgba(255,255,255,0.2); }
        .healthy { border-left: 5px solid #4CAF50; }
        .missing { border-left: 5px solid #F44336; }
        .metric { display: flex; justify-content: space-between; margin: 10px 0; padding: 5px 0; border-bottom: 1px solid rgba(255,255,255,0.1); }
        .countdown { font-size: 1.5em; font-weight: bold; text-align: center; background: rgba(255,255,255,0.1); border-radius: 10px; padding: 20px; margin: 20px 0; }
        .events { display: grid; grid-template-columns: 1fr 1fr; gap: 20px; margin-top: 20px; }
        .status-green { color: #4CAF50; }
        .status-red { color: #F44336; }
        .footer { text-align: center; margin-top: 30px; padding-top: 20px; border-top: 1px solid rgba(255,255,255,0.3); opacity: 0.7; }
        a { color: #87CEEB; text-decoration: none; }
"#;

/// Escape text for element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct DashboardGenerator {
    region: String,
    account: Option<String>,
    path: PathBuf,
    cost: CostEstimate,
}

impl DashboardGenerator {
    pub fn new(region: impl Into<String>, account: Option<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            region: region.into(),
            account,
            path: path.into(),
            cost: ESTIMATE,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.region.clone(),
            config.account_id.clone(),
            config.dashboard_path.clone(),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render and write the page, replacing any previous version
    pub async fn generate(
        &self,
        report: &StatusReport,
        pipeline: &PipelineStatus,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let html = self.render(report, pipeline, now);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, html).await?;

        info!("Dashboard written to {}", self.path.display());
        Ok(self.path.clone())
    }

    pub fn render(&self, report: &StatusReport, pipeline: &PipelineStatus, now: DateTime<Utc>) -> String {
        let healthy = report.is_healthy();
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("    <title>MLOps Dashboard</title>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        html.push_str("    <meta http-equiv=\"refresh\" content=\"300\">\n");
        let _ = writeln!(html, "    <style>{}    </style>", STYLE);
        html.push_str("</head>\n<body>\n    <div class=\"dashboard\">\n");

        self.render_header(&mut html, now);
        Self::render_resources(&mut html, report);
        Self::render_countdowns(&mut html, now);
        self.render_cost_and_links(&mut html, report, pipeline);

        let (banner, note) = if healthy {
            ("SYSTEM HEALTHY", "All resources operational.")
        } else {
            ("ATTENTION NEEDED", "Resources will be redeployed at 8 AM Singapore time.")
        };
        let _ = write!(
            html,
            "        <div class=\"footer\">\n            <p>MLOps Stock Prediction System | Auto-refreshes every 5 minutes</p>\n            <p class=\"{}\" id=\"overall\">{}</p>\n            <p>{}</p>\n        </div>\n",
            if healthy { "status-green" } else { "status-red" },
            banner,
            note
        );

        html.push_str("    </div>\n</body>\n</html>\n");
        html
    }

    fn render_header(&self, html: &mut String, now: DateTime<Utc>) {
        let account = self.account.as_deref().unwrap_or("unknown");
        let _ = write!(
            html,
            "        <div class=\"header\">\n            <h1>MLOps Stock Prediction Dashboard</h1>\n            <p>Last Update: {}</p>\n            <p>Account: {} | Region: {}</p>\n        </div>\n",
            now.format("%Y-%m-%d %H:%M:%S UTC"),
            escape_html(account),
            escape_html(&self.region)
        );
    }

    fn render_resources(html: &mut String, report: &StatusReport) {
        html.push_str("        <div class=\"status-grid\">\n");
        for entry in &report.entries {
            Self::render_card(html, entry);
        }
        html.push_str("        </div>\n");
    }

    fn render_card(html: &mut String, entry: &ResourceStatus) {
        let healthy = entry.is_healthy();
        let (card_class, badge_class) = if healthy {
            ("healthy", "status-green")
        } else {
            ("missing", "status-red")
        };
        let badge = if healthy {
            "Healthy".to_string()
        } else {
            entry.observed.to_string()
        };

        let _ = write!(
            html,
            "            <div class=\"status-card {}\" data-resource=\"{}\">\n                <h3>{}</h3>\n",
            card_class,
            escape_html(&entry.resource.name),
            entry.resource.kind.label()
        );
        let _ = write!(
            html,
            "                <div class=\"metric\"><span>Status:</span><span class=\"{}\">{}</span></div>\n",
            badge_class,
            escape_html(&badge)
        );
        let _ = write!(
            html,
            "                <div class=\"metric\"><span>Name:</span><span>{}</span></div>\n",
            escape_html(&entry.resource.name)
        );
        for (key, value) in &entry.details {
            let _ = write!(
                html,
                "                <div class=\"metric\"><span>{}:</span><span>{}</span></div>\n",
                escape_html(key),
                escape_html(value)
            );
        }
        html.push_str("            </div>\n");
    }

    fn render_countdowns(html: &mut String, now: DateTime<Utc>) {
        html.push_str("        <div class=\"countdown\">\n            <h3>Next Events</h3>\n            <div class=\"events\">\n");
        for event in DAILY_EVENTS {
            let _ = write!(
                html,
                "                <div title=\"{}\">\n                    <div>{}</div>\n                    <div style=\"font-size: 0.7em; margin-top: 5px;\">{}</div>\n                    <div style=\"font-size: 0.5em; margin-top: 5px;\">{} ({})</div>\n                </div>\n",
                event.next_occurrence(now).format("%Y-%m-%d %H:%M UTC"),
                event.label,
                format_countdown(event.countdown(now)),
                event.utc_label(),
                event.local_hint
            );
        }
        html.push_str("            </div>\n        </div>\n");
    }

    fn render_cost_and_links(&self, html: &mut String, report: &StatusReport, pipeline: &PipelineStatus) {
        html.push_str("        <div class=\"status-grid\">\n");
        let _ = write!(
            html,
            "            <div class=\"status-card\">\n                <h3>Cost Monitoring</h3>\n                <div class=\"metric\"><span>Daily:</span><span>{}</span></div>\n                <div class=\"metric\"><span>Monthly:</span><span>{}</span></div>\n                <div class=\"metric\"><span>Yearly:</span><span>{}</span></div>\n            </div>\n",
            format_usd(self.cost.daily_usd),
            format_usd(self.cost.monthly_usd),
            format_usd(self.cost.yearly_usd)
        );

        html.push_str("            <div class=\"status-card\">\n                <h3>Quick Links</h3>\n");
        let _ = write!(
            html,
            "                <div class=\"metric\"><span>Pipeline:</span><span>{}</span></div>\n",
            escape_html(&pipeline.summary())
        );
        if let PipelineStatus::Latest(run) = pipeline {
            if let Some(url) = &run.html_url {
                let _ = write!(
                    html,
                    "                <div style=\"margin: 10px 0;\"><a href=\"{}\" target=\"_blank\">Latest workflow run</a></div>\n",
                    escape_html(url)
                );
            }
        }
        for entry in &report.entries {
            if let Some(url) = self.console_url(entry.resource.kind, &entry.resource.name) {
                let _ = write!(
                    html,
                    "                <div style=\"margin: 10px 0;\"><a href=\"{}\" target=\"_blank\">{} console</a></div>\n",
                    escape_html(&url),
                    entry.resource.kind.label()
                );
            }
        }
        html.push_str("            </div>\n        </div>\n");
    }

    fn console_url(&self, kind: ResourceKind, name: &str) -> Option<String> {
        match kind {
            ResourceKind::Bucket => Some(format!("https://console.aws.amazon.com/s3/buckets/{}", name)),
            ResourceKind::Function => Some(format!(
                "https://console.aws.amazon.com/lambda/home?region={}#/functions/{}",
                self.region, name
            )),
            ResourceKind::Rule => None,
        }
    }
}
