//! # crm-core
//!
//! Provider-agnostic language-model abstraction and the typed prompt flows
//! behind the CRM's AI assist features.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FlowRunner                            │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │  PromptFlow  │──▶│   Messages   │──▶│   LlmProvider    │  │
//! │  │ (typed I/O)  │   │ system+user  │   │   (Strategy)     │  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scoring and summarisation happen in the hosted model. This crate only
//! shapes the request, sends it through `LlmProvider`, and parses the JSON
//! the model returns into a concrete type.

pub mod error;
pub mod flow;
pub mod message;
pub mod provider;

pub use error::{AgentError, Result};
pub use flow::{
    DashboardInsightFlow, DashboardMetrics, DealJourney, DealJourneyFlow, DealSummary,
    EmailDraft, EmailDraftFlow, EmailDraftRequest, FlowRunner, InsightSummary, LeadProfile,
    LeadScore, LeadScoringFlow, PromptFlow,
};
pub use message::{Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
