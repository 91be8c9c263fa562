//! Fixed running-cost estimate for the deployed stack

/// Estimated spend in USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub daily_usd: f64,
    pub monthly_usd: f64,
    pub yearly_usd: f64,
}

/// Storage, a daily function run and one scheduler rule
pub const ESTIMATE: CostEstimate = CostEstimate {
    daily_usd: 0.000004,
    monthly_usd: 0.00012,
    yearly_usd: 0.0014,
};

impl CostEstimate {
    pub fn within(&self, monthly_budget_usd: f64) -> bool {
        self.monthly_usd <= monthly_budget_usd
    }
}

/// `~$0.00012` style, trimming trailing zeros
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.6}", amount);
    let trimmed = fixed.trim_end_matches('0');
    let trimmed = if trimmed.ends_with('.') {
        format!("{}00", trimmed)
    } else {
        trimmed.to_string()
    };
    format!("~${}", trimmed)
}
