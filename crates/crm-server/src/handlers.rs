//! HTTP Handlers

use axum::{
    Form, Json,
    extract::{
        RawQuery, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    response::Redirect,
};
use serde::{Deserialize, Serialize};

use crm_core::{
    AgentError, DashboardInsightFlow, DashboardMetrics, DealJourney, DealJourneyFlow, DealSummary,
    EmailDraft, EmailDraftFlow, EmailDraftRequest, InsightSummary, LeadProfile, LeadScore,
    LeadScoringFlow, PromptFlow,
};
use crm_payments::{
    CallbackOutcome, CallbackQuery, PaymentError, PaymentLinkBuilder, PlanPricing, SignupForm,
    Tier, TxRef,
};

use crate::context::RequestContext;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_connected: bool,
    pub payments_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into(), code: code.into() }))
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanPricing>,
}

/// Signup fields plus the chosen tier
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub signup: SignupForm,
    pub tier: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub tx_ref: TxRef,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm_connected = state.runner.provider().health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_connected,
        payments_configured: state.payments_configured(),
    })
}

/// Collect the signup form and hand it to plan selection
///
/// Nothing is stored; the fields travel on in the redirect URL.
pub async fn submit_signup(
    form: Result<Form<SignupForm>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let Form(form) = form.map_err(|e| {
        api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.body_text())
    })?;

    let form = form.validated().map_err(|e| {
        tracing::debug!(error = %e, "Signup form rejected");
        api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
    })?;

    Ok(Redirect::to(&format!("/select-plan?{}", form.to_query())))
}

/// List subscription plans
pub async fn list_plans() -> Json<PlansResponse> {
    Json(PlansResponse { plans: Tier::ALL.iter().map(|t| t.pricing()).collect() })
}

fn link_builder(state: &AppState) -> Result<&PaymentLinkBuilder, ApiError> {
    state.link_builder.as_deref().ok_or_else(|| {
        api_error(StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_DISABLED", "Payments not configured")
    })
}

/// Create a hosted checkout for a signup
pub async fn create_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let builder = link_builder(&state)?;

    let Json(payload) = payload.map_err(|e| {
        api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.body_text())
    })?;

    let tier: Tier = payload
        .tier
        .parse()
        .map_err(|e: PaymentError| api_error(StatusCode::BAD_REQUEST, "UNKNOWN_TIER", e.user_message()))?;

    let intent = payload
        .signup
        .with_tier(tier)
        .validated()
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string()))?;

    let link = builder.create_for_tier(&intent).await.map_err(|e| {
        tracing::error!("Checkout error: {}", e);
        api_error(StatusCode::BAD_GATEWAY, "PAYMENT_INITIATION_FAILED", e.user_message())
    })?;

    Ok(Json(CheckoutResponse { checkout_url: link.url, tx_ref: link.tx_ref }))
}

/// Provider redirect after checkout
pub async fn payment_callback(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> CallbackOutcome {
    let Some(handler) = state.callback.as_ref() else {
        tracing::error!("Payment callback received but payments are not configured");
        return CallbackOutcome::Error { message: Some("Payments are not available".into()) };
    };

    let query = CallbackQuery::from_query_str(raw.as_deref().unwrap_or_default());
    handler.handle(&query).await
}

fn flow_error(flow: &str, err: &AgentError) -> ApiError {
    match err {
        AgentError::InvalidInput(_) => {
            api_error(StatusCode::BAD_REQUEST, "INVALID_INPUT", err.user_message())
        }
        AgentError::Parse(_) | AgentError::Json(_) => {
            tracing::warn!(flow, error = %err, "AI output rejected");
            api_error(StatusCode::BAD_GATEWAY, "AI_OUTPUT_INVALID", err.user_message())
        }
        _ if err.is_retryable() => {
            tracing::warn!(flow, error = %err, "AI provider unavailable");
            api_error(StatusCode::SERVICE_UNAVAILABLE, "AI_PROVIDER_UNAVAILABLE", err.user_message())
        }
        _ => {
            tracing::error!(flow, error = %err, "AI provider error");
            api_error(StatusCode::BAD_GATEWAY, "AI_PROVIDER_ERROR", err.user_message())
        }
    }
}

async fn run_flow<F>(
    state: &AppState,
    ctx: RequestContext,
    flow: &F,
    payload: Result<Json<F::Input>, JsonRejection>,
) -> Result<Json<F::Output>, ApiError>
where
    F: PromptFlow,
    F::Output: Serialize,
{
    let Json(input) = payload.map_err(|e| {
        api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.body_text())
    })?;

    tracing::info!(
        flow = flow.name(),
        user_id = %ctx.user_id,
        organization_id = %ctx.organization_id,
        "Running AI flow"
    );

    state.runner.run(flow, &input).await.map(Json).map_err(|e| flow_error(flow.name(), &e))
}

/// Score a lead 0-100
pub async fn score_lead(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<LeadProfile>, JsonRejection>,
) -> Result<Json<LeadScore>, ApiError> {
    run_flow(&state, ctx, &LeadScoringFlow, payload).await
}

/// Draft an outbound email
pub async fn draft_email(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<EmailDraftRequest>, JsonRejection>,
) -> Result<Json<EmailDraft>, ApiError> {
    run_flow(&state, ctx, &EmailDraftFlow, payload).await
}

/// Summarize a deal's journey through the pipeline
pub async fn summarize_deal(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<DealJourney>, JsonRejection>,
) -> Result<Json<DealSummary>, ApiError> {
    run_flow(&state, ctx, &DealJourneyFlow, payload).await
}

/// Turn dashboard metrics into a short narrative
pub async fn dashboard_insights(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<DashboardMetrics>, JsonRejection>,
) -> Result<Json<InsightSummary>, ApiError> {
    run_flow(&state, ctx, &DashboardInsightFlow, payload).await
}
