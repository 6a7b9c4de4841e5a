//! Email Drafting

use serde::{Deserialize, Serialize};

use super::{PromptFlow, to_prompt_json};
use crate::error::{AgentError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Formal,
    Persuasive,
}

/// What the email should accomplish
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraftRequest {
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_company: Option<String>,
    /// e.g. "follow up after demo", "renewal reminder"
    pub purpose: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Name used in the sign-off
    #[serde(default)]
    pub sender_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

/// Drafts a customer-facing email
#[derive(Clone, Copy, Debug, Default)]
pub struct EmailDraftFlow;

impl PromptFlow for EmailDraftFlow {
    type Input = EmailDraftRequest;
    type Output = EmailDraft;

    fn name(&self) -> &'static str {
        "email_draft"
    }

    fn system_prompt(&self) -> &'static str {
        r#"You write concise sales and account-management emails for a CRM user.

Keep the body under 200 words, address the recipient by name, cover every key point, and match the requested tone. Do not invent prices, dates or commitments that are not in the request.

Respond with a single JSON object and nothing else:
{"subject": "<subject line>", "body": "<plain-text email body>"}"#
    }

    fn render(&self, input: &EmailDraftRequest) -> Result<String> {
        if input.recipient_name.trim().is_empty() || input.purpose.trim().is_empty() {
            return Err(AgentError::InvalidInput(
                "recipient name and purpose are required".into(),
            ));
        }
        Ok(format!("Draft an email for this request:\n{}", to_prompt_json(input)?))
    }

    fn finish(&self, output: EmailDraft) -> Result<EmailDraft> {
        if output.subject.trim().is_empty() || output.body.trim().is_empty() {
            return Err(AgentError::Parse("draft is missing a subject or body".into()));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::flow::FlowRunner;
    use crate::flow::testing::CannedProvider;
    use crate::provider::GenerationOptions;

    fn request() -> EmailDraftRequest {
        EmailDraftRequest {
            recipient_name: "Tomás".into(),
            recipient_company: None,
            purpose: "follow up after demo".into(),
            tone: Tone::Friendly,
            key_points: vec!["trial extended to 30 days".into()],
            sender_name: Some("Ngozi".into()),
        }
    }

    #[tokio::test]
    async fn test_drafts_email_from_fenced_reply() {
        let provider = Arc::new(CannedProvider::replying(
            "```json\n{\"subject\": \"Great chatting\", \"body\": \"Hi Tomás, ...\"}\n```",
        ));
        let runner = FlowRunner::new(provider.clone(), GenerationOptions::default());

        let draft = runner.run(&EmailDraftFlow, &request()).await.unwrap();
        assert_eq!(draft.subject, "Great chatting");

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0][1].content.contains("\"friendly\""));
    }

    #[tokio::test]
    async fn test_empty_body_is_parse_error() {
        let provider = Arc::new(CannedProvider::replying(r#"{"subject": "Hi", "body": " "}"#));
        let runner = FlowRunner::new(provider, GenerationOptions::default());

        let err = runner.run(&EmailDraftFlow, &request()).await.unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[test]
    fn test_tone_defaults_to_professional() {
        let req: EmailDraftRequest =
            serde_json::from_str(r#"{"recipientName": "A", "purpose": "intro"}"#).unwrap();
        assert_eq!(req.tone, Tone::Professional);
    }
}
