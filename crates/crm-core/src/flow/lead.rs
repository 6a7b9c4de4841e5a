//! Lead Scoring

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::{PromptFlow, to_prompt_json};
use crate::error::{AgentError, Result};

/// What the CRM knows about a lead
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadProfile {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Where the lead came from (referral, website, event, ...)
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<Decimal>,
    #[serde(default)]
    pub interactions: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Model verdict on a lead
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeadScore {
    /// 0 (cold) to 100 (ready to buy)
    #[serde(deserialize_with = "score_from_number")]
    pub score: u32,
    pub rationale: String,
    #[serde(default)]
    pub next_action: Option<String>,
}

pub const MAX_LEAD_SCORE: u32 = 100;

/// Round a model-supplied score and clamp it into 0..=100
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_score(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_LEAD_SCORE)) as u32
}

/// Accept any JSON number, e.g. `72.5` or `-5`
fn score_from_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_score)
}

/// Scores a lead's likelihood to convert
#[derive(Clone, Copy, Debug, Default)]
pub struct LeadScoringFlow;

impl PromptFlow for LeadScoringFlow {
    type Input = LeadProfile;
    type Output = LeadScore;

    fn name(&self) -> &'static str {
        "lead_scoring"
    }

    fn system_prompt(&self) -> &'static str {
        r#"You are a sales analyst for a B2B CRM. Score how likely a lead is to convert into a paying customer.

Weigh engagement (number and recency of interactions), fit (title, industry, company), and intent signals in the notes.

Respond with a single JSON object and nothing else:
{"score": <integer 0-100>, "rationale": "<two sentences>", "nextAction": "<one concrete follow-up>"}"#
    }

    fn render(&self, input: &LeadProfile) -> Result<String> {
        if input.name.trim().is_empty() {
            return Err(AgentError::InvalidInput("lead name is required".into()));
        }
        Ok(format!("Score this lead:\n{}", to_prompt_json(input)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::flow::FlowRunner;
    use crate::flow::testing::CannedProvider;
    use crate::provider::GenerationOptions;

    fn lead() -> LeadProfile {
        LeadProfile {
            name: "Adaeze Okafor".into(),
            company: Some("Lagos Freight".into()),
            title: Some("Head of Operations".into()),
            source: Some("referral".into()),
            industry: Some("logistics".into()),
            estimated_value: Some(dec!(12000)),
            interactions: vec!["Demo call".into(), "Asked for pricing".into()],
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_scores_lead() {
        let provider = Arc::new(CannedProvider::replying(
            r#"{"score": 82, "rationale": "Engaged and a good fit.", "nextAction": "Send proposal"}"#,
        ));
        let runner = FlowRunner::new(provider.clone(), GenerationOptions::default());

        let score = runner.run(&LeadScoringFlow, &lead()).await.unwrap();
        assert_eq!(score.score, 82);
        assert_eq!(score.next_action.as_deref(), Some("Send proposal"));

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0][1].content.contains("Lagos Freight"));
    }

    #[tokio::test]
    async fn test_score_is_clamped() {
        let provider = Arc::new(CannedProvider::replying(
            r#"{"score": 140, "rationale": "Very keen."}"#,
        ));
        let runner = FlowRunner::new(provider, GenerationOptions::default());

        let score = runner.run(&LeadScoringFlow, &lead()).await.unwrap();
        assert_eq!(score.score, MAX_LEAD_SCORE);
    }

    #[tokio::test]
    async fn test_fractional_and_negative_scores_are_normalized() {
        for (reply, expected) in [
            (r#"{"score": 72.5, "rationale": "Warm."}"#, 73),
            (r#"{"score": 72.4, "rationale": "Warm."}"#, 72),
            (r#"{"score": -5, "rationale": "Churned."}"#, 0),
            (r#"{"score": 1e9, "rationale": "Eager."}"#, MAX_LEAD_SCORE),
        ] {
            let provider = Arc::new(CannedProvider::replying(reply));
            let runner = FlowRunner::new(provider, GenerationOptions::default());
            let score = runner.run(&LeadScoringFlow, &lead()).await.unwrap();
            assert_eq!(score.score, expected, "reply: {reply}");
        }
    }

    #[tokio::test]
    async fn test_non_numeric_score_is_parse_error() {
        let provider = Arc::new(CannedProvider::replying(r#"{"score": "high", "rationale": "?"}"#));
        let runner = FlowRunner::new(provider, GenerationOptions::default());

        let err = runner.run(&LeadScoringFlow, &lead()).await.unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_model_call() {
        let provider = Arc::new(CannedProvider::replying("{}"));
        let runner = FlowRunner::new(provider.clone(), GenerationOptions::default());

        let mut input = lead();
        input.name = "  ".into();
        let err = runner.run(&LeadScoringFlow, &input).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(CannedProvider::failing("connection refused"));
        let runner = FlowRunner::new(provider, GenerationOptions::default());

        let err = runner.run(&LeadScoringFlow, &lead()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
