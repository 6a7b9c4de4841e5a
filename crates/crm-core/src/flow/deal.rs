//! Deal Journey Summaries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PromptFlow, to_prompt_json};
use crate::error::{AgentError, Result};

/// A stage transition in a deal's history
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub stage: String,
    pub entered_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealJourney {
    pub deal_name: String,
    pub customer_name: String,
    pub value: Decimal,
    pub currency: String,
    pub current_stage: String,
    #[serde(default)]
    pub stages: Vec<StageEvent>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl DealJourney {
    /// Stages in chronological order
    fn ordered(&self) -> Self {
        let mut journey = self.clone();
        journey.stages.sort_by_key(|s| s.entered_at);
        journey
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DealSummary {
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Summarises how a deal progressed through the pipeline
#[derive(Clone, Copy, Debug, Default)]
pub struct DealJourneyFlow;

impl PromptFlow for DealJourneyFlow {
    type Input = DealJourney;
    type Output = DealSummary;

    fn name(&self) -> &'static str {
        "deal_journey"
    }

    fn system_prompt(&self) -> &'static str {
        r#"You summarise the history of a sales deal for an account manager.

Describe how the deal moved through the pipeline, how long it spent in each stage, and where it stands now. Call out stalls and risks. Use only the facts provided.

Respond with a single JSON object and nothing else:
{"summary": "<one paragraph>", "risks": ["<risk>", ...], "nextSteps": ["<step>", ...]}"#
    }

    fn render(&self, input: &DealJourney) -> Result<String> {
        if input.deal_name.trim().is_empty() {
            return Err(AgentError::InvalidInput("deal name is required".into()));
        }
        Ok(format!(
            "Summarise this deal journey:\n{}",
            to_prompt_json(&input.ordered())?
        ))
    }
}
