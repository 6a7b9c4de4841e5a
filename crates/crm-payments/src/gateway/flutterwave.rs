//! Flutterwave v3 REST Client

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{PaymentGateway, PaymentLinkData, PaymentPayload, ProviderResponse, TransactionData};
use crate::error::{PaymentError, Result};

const DEFAULT_API_BASE: &str = "https://api.flutterwave.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Provider credentials and endpoints
#[derive(Clone)]
pub struct GatewayConfig {
    /// Secret key sent as the bearer credential
    pub secret_key: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_API_BASE.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("PAYMENT_SECRET_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PaymentError::Config("PAYMENT_SECRET_KEY not set".into()))?;

        let mut config = Self::new(secret_key);
        if let Ok(base) = std::env::var("PAYMENT_API_BASE") {
            config.api_base = base;
        }
        if let Some(secs) = std::env::var("PAYMENT_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()) {
            config.timeout_secs = secs;
        }
        Ok(config)
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Flutterwave client wrapper
pub struct FlutterwaveClient {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl FlutterwaveClient {
    /// Create a new client with a bounded request timeout
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Verify endpoint with the id percent-encoded as a single path segment
    fn verify_url(&self, transaction_id: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.config.api_base)
            .map_err(|e| PaymentError::Config(format!("invalid api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config("api base cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["v3", "transactions", transaction_id, "verify"]);
        Ok(url)
    }

    /// Read a response envelope, turning non-2xx into `fail(message)`
    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
        fail: fn(String) -> PaymentError,
    ) -> Result<ProviderResponse<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| fail(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| format!("provider returned {status}"));
            return Err(fail(message));
        }

        serde_json::from_str(&body).map_err(|e| fail(format!("unexpected response body: {e}")))
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveClient {
    fn name(&self) -> &str {
        "Flutterwave"
    }

    async fn initiate_payment(
        &self,
        payload: &PaymentPayload,
    ) -> Result<ProviderResponse<PaymentLinkData>> {
        let response = self
            .client
            .post(self.url("/v3/payments"))
            .bearer_auth(&self.config.secret_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| PaymentError::Initiation(transport_message(&e)))?;

        Self::read_envelope(response, PaymentError::Initiation).await
    }

    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<ProviderResponse<TransactionData>> {
        let response = self
            .client
            .get(self.verify_url(transaction_id)?)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| PaymentError::Verification(transport_message(&e)))?;

        Self::read_envelope(response, PaymentError::Verification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::new("FLWSECK_TEST-123");
        assert_eq!(config.api_base, "https://api.flutterwave.com");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", GatewayConfig::new("FLWSECK_TEST-123"));
        assert!(!rendered.contains("FLWSECK"));
    }

    #[test]
    fn test_url_joining() {
        let mut config = GatewayConfig::new("k");
        config.api_base = "http://localhost:9000/".into();
        let client = FlutterwaveClient::new(config).unwrap();
        assert_eq!(client.url("/v3/payments"), "http://localhost:9000/v3/payments");
        assert_eq!(
            client.verify_url("42").unwrap().as_str(),
            "http://localhost:9000/v3/transactions/42/verify"
        );
    }

    #[test]
    fn test_transaction_id_cannot_escape_path() {
        let client = FlutterwaveClient::new(GatewayConfig::new("k")).unwrap();
        let url = client.verify_url("../../v3/payments").unwrap();
        assert_eq!(url.path(), "/v3/transactions/..%2F..%2Fv3%2Fpayments/verify");
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_verification_error() {
        let mut config = GatewayConfig::new("k");
        config.api_base = "http://127.0.0.1:9".into();
        config.timeout_secs = 2;
        let client = FlutterwaveClient::new(config).unwrap();

        let err = client.verify_transaction("42").await.unwrap_err();
        assert!(matches!(err, PaymentError::Verification(_)));
    }
}
