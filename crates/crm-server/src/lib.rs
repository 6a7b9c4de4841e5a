//! # crm-server
//!
//! Axum server for the CRM's paid signup flow and AI assist endpoints.
//!
//! ```text
//! POST /api/signup ──303──▶ /select-plan?...
//! POST /api/checkout ─────▶ { checkout_url, tx_ref } ──▶ provider page
//! GET  /payment/callback ─▶ verify ─▶ provision ─▶ 303 /login | /pricing
//! ```

pub mod config;
pub mod context;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    create_checkout, dashboard_insights, draft_email, health_check, list_plans, payment_callback,
    score_lead, submit_signup, summarize_deal,
};
pub use crate::state::AppState;

/// Build the application router with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))

        // Signup & checkout
        .route("/api/signup", post(submit_signup))
        .route("/api/plans", get(list_plans))
        .route("/api/checkout", post(create_checkout))
        .route(crm_payments::CALLBACK_PATH, get(payment_callback))

        // AI assist
        .route("/api/ai/lead-score", post(score_lead))
        .route("/api/ai/email-draft", post(draft_email))
        .route("/api/ai/deal-summary", post(summarize_deal))
        .route("/api/ai/dashboard-insights", post(dashboard_insights))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
