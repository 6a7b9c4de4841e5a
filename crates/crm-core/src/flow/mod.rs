//! Prompt Flows
//!
//! A flow is a prompt template with a typed input and a typed output. The
//! runner renders the input, sends it to the model, and parses the JSON
//! answer back into the output type.

mod dashboard;
mod deal;
mod email;
mod lead;

pub use dashboard::{
    DashboardInsightFlow, DashboardMetrics, InsightSummary, MonthlyRevenue, StageBreakdown,
};
pub use deal::{DealJourney, DealJourneyFlow, DealSummary, StageEvent};
pub use email::{EmailDraft, EmailDraftFlow, EmailDraftRequest, Tone};
pub use lead::{LeadProfile, LeadScore, LeadScoringFlow};

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};

/// A typed prompt template
pub trait PromptFlow: Send + Sync {
    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned + Send;

    /// Stable identifier used in logs
    fn name(&self) -> &'static str;

    /// Instructions sent as the system message
    fn system_prompt(&self) -> &'static str;

    /// Render the user message for one input
    fn render(&self, input: &Self::Input) -> Result<String>;

    /// Post-process a parsed answer (clamping, emptiness checks)
    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        Ok(output)
    }
}

/// Executes prompt flows against a provider
#[derive(Clone)]
pub struct FlowRunner {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl FlowRunner {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Run one flow to completion
    pub async fn run<F: PromptFlow>(&self, flow: &F, input: &F::Input) -> Result<F::Output> {
        let messages = vec![
            Message::system(flow.system_prompt()),
            Message::user(flow.render(input)?),
        ];

        let completion = self.provider.complete(&messages, &self.options).await?;

        tracing::debug!(
            flow = flow.name(),
            model = %completion.model,
            tokens = completion.usage.map(|u| u.total_tokens),
            "Flow completed"
        );

        let output = parse_output::<F::Output>(&completion.content).map_err(|e| {
            tracing::warn!(flow = flow.name(), error = %e, "Model returned unparseable output");
            e
        })?;

        flow.finish(output)
    }
}

/// Parse the model's reply into `T`, accepting fenced or bare JSON
pub fn parse_output<T: DeserializeOwned>(content: &str) -> Result<T> {
    let json = extract_json(content)
        .ok_or_else(|| AgentError::Parse("no JSON object in model output".into()))?;

    serde_json::from_str(json).map_err(|e| AgentError::Parse(e.to_string()))
}

/// Locate the JSON object in a model reply
fn extract_json(content: &str) -> Option<&str> {
    for fence in ["```json", "```"] {
        if let Some(start_idx) = content.find(fence) {
            let after_marker = &content[start_idx + fence.len()..];
            if let Some(end_idx) = after_marker.find("```") {
                let candidate = after_marker[..end_idx].trim();
                if candidate.starts_with('{') {
                    return Some(candidate);
                }
            }
        }
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&content[start..=end])
}

fn to_prompt_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}


#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: u32,
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "Here you go:\n```json\n{\"value\": 7}\n```\nAnything else?";
        assert_eq!(parse_output::<Answer>(reply).unwrap(), Answer { value: 7 });
    }

    #[test]
    fn test_parse_bare_json_with_prose() {
        let reply = "Sure! {\"value\": 3} Hope that helps.";
        assert_eq!(parse_output::<Answer>(reply).unwrap(), Answer { value: 3 });
    }

    #[test]
    fn test_parse_plain_fence() {
        let reply = "```\n{\"value\": 11}\n```";
        assert_eq!(parse_output::<Answer>(reply).unwrap(), Answer { value: 11 });
    }

    #[test]
    fn test_parse_without_json_fails() {
        let err = parse_output::<Answer>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[test]
    fn test_parse_wrong_shape_fails() {
        let err = parse_output::<Answer>("{\"other\": true}").unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }
}
