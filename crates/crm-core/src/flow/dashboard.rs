//! Dashboard Insight Summaries
//!
//! Metrics are a concrete type on the producing side. They become a generic
//! JSON value only when rendered into the prompt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::PromptFlow;
use crate::error::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBreakdown {
    pub stage: String,
    pub count: u64,
    pub value: Decimal,
}

/// Aggregated dashboard numbers for one organization
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub currency: String,
    pub total_customers: u64,
    #[serde(default)]
    pub new_customers: u64,
    #[serde(default)]
    pub new_leads: u64,
    #[serde(default)]
    pub converted_leads: u64,
    #[serde(default)]
    pub open_deals: u64,
    #[serde(default)]
    pub won_deals: u64,
    #[serde(default)]
    pub lost_deals: u64,
    #[serde(default)]
    pub pipeline_value: Decimal,
    #[serde(default)]
    pub won_value: Decimal,
    #[serde(default)]
    pub monthly_revenue: Vec<MonthlyRevenue>,
    #[serde(default)]
    pub deals_by_stage: Vec<StageBreakdown>,
}

impl DashboardMetrics {
    /// Share of closed deals that were won, in percent
    pub fn win_rate(&self) -> Option<f64> {
        let closed = self.won_deals + self.lost_deals;
        (closed > 0).then(|| percent(self.won_deals, closed))
    }

    /// Share of new leads that converted, in percent
    pub fn lead_conversion_rate(&self) -> Option<f64> {
        (self.new_leads > 0).then(|| percent(self.converted_leads, self.new_leads))
    }

    /// Serialize for the model, adding derived ratios
    pub fn to_prompt_value(&self) -> Result<Value> {
        Ok(json!({
            "metrics": serde_json::to_value(self)?,
            "derived": {
                "winRatePercent": self.win_rate(),
                "leadConversionPercent": self.lead_conversion_rate(),
            },
        }))
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsightSummary {
    pub headline: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Turns dashboard numbers into a short written briefing
#[derive(Clone, Copy, Debug, Default)]
pub struct DashboardInsightFlow;

impl PromptFlow for DashboardInsightFlow {
    type Input = DashboardMetrics;
    type Output = InsightSummary;

    fn name(&self) -> &'static str {
        "dashboard_insights"
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a revenue operations analyst. Read a CRM dashboard snapshot and brief the team.

Quote numbers exactly as given, in the stated currency. Point out trends in monthly revenue and bottlenecks in the pipeline stages.

Respond with a single JSON object and nothing else:
{"headline": "<one sentence>", "highlights": ["<fact>", ...], "recommendations": ["<action>", ...]}"#
    }

    fn render(&self, input: &DashboardMetrics) -> Result<String> {
        let value = input.to_prompt_value()?;
        Ok(format!(
            "Summarise this dashboard:\n{}",
            serde_json::to_string_pretty(&value)?
        ))
    }
}
