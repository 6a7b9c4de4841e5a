//! CRM HTTP Server
//!
//! Wires the model provider, payment gateway and tenant store into the
//! router and serves it.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crm_core::{FlowRunner, GenerationOptions, LlmProvider};
use crm_payments::{
    CallbackHandler, CheckoutConfig, FlutterwaveClient, GatewayConfig, MemoryTenantRegistrar,
    MemoryTransactionLedger, PaymentGateway, PaymentLinkBuilder,
};
use crm_runtime::OllamaProvider;
use crm_server::{AppState, build_router, config::ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    // Initialize LLM provider
    let ollama = OllamaProvider::from_env()?;
    let options = GenerationOptions::default().with_model(ollama.config().model.clone());
    let provider: Arc<dyn LlmProvider> = Arc::new(ollama);

    match provider.health_check().await {
        Ok(true) => tracing::info!(model = %options.model, "✓ Connected to model provider"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Model provider not available - AI endpoints will fail");
            tracing::warn!("  Check LLM_BASE_URL or run: ollama serve");
        }
    }

    // Initialize payments
    let (link_builder, callback) = match (GatewayConfig::from_env(), CheckoutConfig::from_env()) {
        (Ok(gateway_config), Ok(checkout_config)) => {
            let verify_timeout = Duration::from_secs(gateway_config.timeout_secs);
            let gateway: Arc<dyn PaymentGateway> = Arc::new(FlutterwaveClient::new(gateway_config)?);
            let registrar = Arc::new(MemoryTenantRegistrar::new(checkout_config.currency.clone()));
            let ledger = Arc::new(MemoryTransactionLedger::new().with_retention(config.ledger_retention));

            tracing::info!(
                gateway = gateway.name(),
                currency = %checkout_config.currency,
                "✓ Payments configured"
            );

            let callback = CallbackHandler::new(gateway.clone(), registrar, ledger)
                .with_verify_timeout(verify_timeout)
                .with_registration_timeout(config.registration_timeout)
                .with_currency(checkout_config.currency.clone());
            let builder = PaymentLinkBuilder::new(gateway, checkout_config);

            (Some(Arc::new(builder)), Some(Arc::new(callback)))
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "⚠ Payments not configured - signup checkout disabled");
            tracing::warn!("  Set PAYMENT_SECRET_KEY and PUBLIC_BASE_URL in .env");
            (None, None)
        }
    };

    let state = AppState {
        runner: FlowRunner::new(provider, options),
        link_builder,
        callback,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 crm-server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                  - Health check");
    tracing::info!("  POST /api/signup              - Submit signup form");
    tracing::info!("  GET  /api/plans               - List plans");
    tracing::info!("  POST /api/checkout            - Create checkout link");
    tracing::info!("  GET  /payment/callback        - Provider redirect");
    tracing::info!("  POST /api/ai/lead-score       - Score a lead");
    tracing::info!("  POST /api/ai/email-draft      - Draft an email");
    tracing::info!("  POST /api/ai/deal-summary     - Summarize a deal");
    tracing::info!("  POST /api/ai/dashboard-insights - Dashboard narrative");

    axum::serve(listener, app).await?;

    Ok(())
}
