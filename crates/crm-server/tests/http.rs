use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use crm_core::{AgentError, Completion, FlowRunner, GenerationOptions, LlmProvider, Message};
use crm_payments::{
    CallbackHandler, CheckoutConfig, MemoryTenantRegistrar, MemoryTransactionLedger,
    MockPaymentGateway, PaymentLinkBuilder,
};
use crm_server::{AppState, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const USER_ID: &str = "6f1c2a9e-3b7d-4c55-9a0e-2d8f1b4c7e11";
const ORG_ID: &str = "0b9d7e4a-51c3-4f28-8e6a-93c2d1f0a7b4";

/// Model stand-in that always answers with the same text
struct FixedReply(String);

#[async_trait]
impl LlmProvider for FixedReply {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn health_check(&self) -> crm_core::Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        _messages: &[Message],
        options: &GenerationOptions,
    ) -> crm_core::Result<Completion> {
        Ok(Completion {
            content: self.0.clone(),
            model: options.model.clone(),
            usage: None,
            finish_reason: None,
        })
    }
}

/// Model stand-in whose host is down
struct Unreachable;

#[async_trait]
impl LlmProvider for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn health_check(&self) -> crm_core::Result<bool> {
        Ok(false)
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> crm_core::Result<Completion> {
        Err(AgentError::ProviderUnavailable("connection refused".into()))
    }
}

struct TestApp {
    state: AppState,
    gateway: Arc<MockPaymentGateway>,
    registrar: Arc<MemoryTenantRegistrar>,
}

impl TestApp {
    fn new(reply: &str) -> Self {
        Self::with_provider(Arc::new(FixedReply(reply.into())))
    }

    fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        let gateway = Arc::new(MockPaymentGateway::new());
        let registrar = Arc::new(MemoryTenantRegistrar::default());
        let ledger = Arc::new(MemoryTransactionLedger::new());

        let builder = PaymentLinkBuilder::new(
            gateway.clone(),
            CheckoutConfig::new("https://crm.example.com").unwrap(),
        );
        let callback = CallbackHandler::new(gateway.clone(), registrar.clone(), ledger);

        let state = AppState {
            runner: FlowRunner::new(provider, GenerationOptions::default()),
            link_builder: Some(Arc::new(builder)),
            callback: Some(Arc::new(callback)),
        };
        Self { state, gateway, registrar }
    }

    fn without_payments() -> AppState {
        let mut state = Self::new("{}").state;
        state.link_builder = None;
        state.callback = None;
        state
    }

    async fn send(&self, request: Request<Body>) -> Response {
        build_router(self.state.clone()).oneshot(request).await.unwrap()
    }
}

async fn json_body(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(res: &Response) -> &str {
    res.headers()["location"].to_str().unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_ai(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", USER_ID)
        .header("x-organization-id", ORG_ID)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn checkout_body(tier: &str) -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "password": "password123",
        "organizationName": "Analytical Engines",
        "tier": tier,
    })
}

#[tokio::test]
async fn health_reports_components() {
    let app = TestApp::new("{}");
    let res = app.send(get("/health")).await;

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["llm_connected"], json!(true));
    assert_eq!(body["payments_configured"], json!(true));
}

#[tokio::test]
async fn signup_redirects_to_plan_selection() {
    let app = TestApp::new("{}");
    let res = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/signup")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "name=Ada+Lovelace&email=ada%40example.com&password=password123&organizationName=Analytical+Engines",
                ))
                .unwrap(),
        )
        .await;

    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(
        location(&res),
        "/select-plan?name=Ada+Lovelace&email=ada%40example.com&password=password123&organizationName=Analytical+Engines"
    );
}

#[tokio::test]
async fn signup_with_invalid_email_is_422() {
    let app = TestApp::new("{}");
    let res = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/signup")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("name=Ada&email=nope&password=password123&organizationName=AE"))
                .unwrap(),
        )
        .await;

    assert_eq!(res.status().as_u16(), 422);
    assert_eq!(json_body(res).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn plans_lists_every_tier() {
    let app = TestApp::new("{}");
    let body = json_body(app.send(get("/api/plans")).await).await;

    let tiers: Vec<&str> =
        body["plans"].as_array().unwrap().iter().map(|p| p["tier"].as_str().unwrap()).collect();
    assert_eq!(tiers, ["starter", "growth", "enterprise"]);
}

#[tokio::test]
async fn checkout_returns_provider_link() {
    let app = TestApp::new("{}");
    let res = app.send(post_json("/api/checkout", &checkout_body("growth"))).await;

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    let tx_ref = body["tx_ref"].as_str().unwrap();
    assert!(tx_ref.starts_with("crm-growth-"));
    assert_eq!(body["checkout_url"], format!("https://checkout.mock/pay/{tx_ref}"));
    assert_eq!(app.gateway.initiations().len(), 1);
}

#[tokio::test]
async fn checkout_initiation_failure_is_502() {
    let app = TestApp::new("{}");
    app.gateway.reject_initiation("Invalid authorization key");

    let res = app.send(post_json("/api/checkout", &checkout_body("starter"))).await;

    assert_eq!(res.status().as_u16(), 502);
    assert!(res.headers().get("location").is_none());
    assert_eq!(json_body(res).await["code"], "PAYMENT_INITIATION_FAILED");
}

#[tokio::test]
async fn checkout_unknown_tier_is_400() {
    let app = TestApp::new("{}");
    let res = app.send(post_json("/api/checkout", &checkout_body("platinum"))).await;

    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await["code"], "UNKNOWN_TIER");
    assert!(app.gateway.initiations().is_empty());
}

#[tokio::test]
async fn checkout_without_payments_is_503() {
    let state = TestApp::without_payments();
    let res = build_router(state)
        .oneshot(post_json("/api/checkout", &checkout_body("growth")))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 503);
    assert_eq!(json_body(res).await["code"], "PAYMENTS_DISABLED");
}

#[tokio::test]
async fn paid_checkout_provisions_tenant_and_redirects_to_login() {
    let app = TestApp::new("{}");
    let body = json_body(app.send(post_json("/api/checkout", &checkout_body("enterprise"))).await).await;
    let tx_ref = body["tx_ref"].as_str().unwrap().to_string();

    let transaction_id = app.gateway.complete_checkout(&tx_ref).unwrap();
    let uri = format!("/payment/callback?status=successful&tx_ref={tx_ref}&transaction_id={transaction_id}");

    let res = app.send(get(&uri)).await;
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(location(&res), "/login?payment=success");
    assert!(app.registrar.find_admin_by_email("ada@example.com").unwrap().is_some());

    // Replaying the redirect must not create a second tenant
    let res = app.send(get(&uri)).await;
    assert_eq!(location(&res), "/login?payment=success");
    assert_eq!(app.registrar.organization_count().unwrap(), 1);
}

#[tokio::test]
async fn cancelled_callback_redirects_to_pricing() {
    let app = TestApp::new("{}");
    let res = app.send(get("/payment/callback?status=cancelled&tx_ref=crm-starter-1-abc")).await;

    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(location(&res), "/pricing?status=cancelled");
}

#[tokio::test]
async fn cancelled_callback_with_repeated_keys_still_cancels() {
    let app = TestApp::new("{}");
    let res = app.send(get("/payment/callback?status=cancelled&tx_ref=a&tx_ref=b")).await;

    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(location(&res), "/pricing?status=cancelled");
}

#[tokio::test]
async fn callback_with_repeated_keys_uses_first_value() {
    let app = TestApp::new("{}");
    let body = json_body(app.send(post_json("/api/checkout", &checkout_body("starter"))).await).await;
    let tx_ref = body["tx_ref"].as_str().unwrap().to_string();
    let transaction_id = app.gateway.complete_checkout(&tx_ref).unwrap();

    let uri = format!(
        "/payment/callback?status=successful&tx_ref={tx_ref}&tx_ref=forged&transaction_id={transaction_id}&transaction_id=1"
    );
    let res = app.send(get(&uri)).await;

    assert_eq!(location(&res), "/login?payment=success");
    assert_eq!(app.gateway.verifications(), vec![transaction_id]);
}

#[tokio::test]
async fn callback_without_payments_redirects_to_error_page() {
    let state = TestApp::without_payments();
    let res = build_router(state)
        .oneshot(get("/payment/callback?status=successful&tx_ref=crm-starter-1-abc&transaction_id=9"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(location(&res), "/pricing?status=error&message=Payments+are+not+available");
}

#[tokio::test]
async fn forged_callback_without_transaction_falls_back() {
    let app = TestApp::new("{}");
    let res = app.send(get("/payment/callback?status=successful&tx_ref=crm-starter-1-abc")).await;

    assert_eq!(location(&res), "/pricing");
    assert!(app.gateway.verifications().is_empty());
}

#[tokio::test]
async fn ai_route_requires_identity() {
    let app = TestApp::new(r#"{"score": 80, "rationale": "warm"}"#);
    let res = app.send(post_json("/api/ai/lead-score", &json!({"name": "Grace"}))).await;

    assert_eq!(res.status().as_u16(), 401);
    assert_eq!(json_body(res).await["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn lead_score_parses_fenced_reply() {
    let app = TestApp::new("Here you go:\n```json\n{\"score\": 140, \"rationale\": \"Budget confirmed\"}\n```");
    let res = app
        .send(post_ai("/api/ai/lead-score", &json!({"name": "Grace", "company": "Hopper Labs"})))
        .await;

    assert_eq!(res.status().as_u16(), 200);
    let body = json_body(res).await;
    assert_eq!(body["score"], 100);
    assert_eq!(body["rationale"], "Budget confirmed");
}

#[tokio::test]
async fn lead_score_accepts_fractional_score() {
    let app = TestApp::new(r#"{"score": 72.5, "rationale": "ok"}"#);
    let res = app.send(post_ai("/api/ai/lead-score", &json!({"name": "Grace"}))).await;

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["score"], 73);
}

#[tokio::test]
async fn lead_score_floors_negative_score() {
    let app = TestApp::new(r#"{"score": -12, "rationale": "Unsubscribed"}"#);
    let res = app.send(post_ai("/api/ai/lead-score", &json!({"name": "Grace"}))).await;

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["score"], 0);
}

#[tokio::test]
async fn unavailable_model_provider_is_503() {
    let app = TestApp::with_provider(Arc::new(Unreachable));
    let res = app.send(post_ai("/api/ai/lead-score", &json!({"name": "Grace"}))).await;

    assert_eq!(res.status().as_u16(), 503);
    let body = json_body(res).await;
    assert_eq!(body["code"], "AI_PROVIDER_UNAVAILABLE");
    assert!(!body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn unparseable_model_reply_is_502() {
    let app = TestApp::new("I am not able to help with that.");
    let res = app
        .send(post_ai("/api/ai/email-draft", &json!({
            "recipientName": "Grace",
            "purpose": "Follow up on demo",
        })))
        .await;

    assert_eq!(res.status().as_u16(), 502);
    assert_eq!(json_body(res).await["code"], "AI_OUTPUT_INVALID");
}

#[tokio::test]
async fn dashboard_insights_accepts_typed_metrics() {
    let app = TestApp::new(
        r#"{"headline": "Revenue up", "highlights": ["3 deals won"], "recommendations": []}"#,
    );
    let res = app
        .send(post_ai("/api/ai/dashboard-insights", &json!({
            "currency": "NGN",
            "totalCustomers": 12,
            "wonDeals": 3,
            "lostDeals": 1,
        })))
        .await;

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["headline"], "Revenue up");
}
