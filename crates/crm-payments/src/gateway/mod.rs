//! Payment Provider Integration
//!
//! Wire types for the provider's REST API and the `PaymentGateway` seam the
//! link builder and callback handler depend on.

mod flutterwave;
mod mock;

pub use flutterwave::{FlutterwaveClient, GatewayConfig};
pub use mock::MockPaymentGateway;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Envelope shared by every provider response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderResponse<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ProviderResponse<T> {
    pub fn success(data: T) -> Self {
        Self { status: "success".into(), message: None, data: Some(data) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".into(), message: Some(message.into()), data: None }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Checkout creation request body (`POST /v3/payments`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentPayload {
    pub tx_ref: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub redirect_url: String,
    pub customer: PaymentCustomer,
    pub customizations: Customizations,
    pub meta: PaymentMeta,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentCustomer {
    pub email: String,
    pub name: String,
}

/// Branding shown on the hosted checkout page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customizations {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub logo: Option<String>,
}

/// Opaque metadata the provider stores and echoes back on verification
#[derive(Clone, Serialize, Deserialize)]
pub struct PaymentMeta {
    #[serde(rename = "signupData")]
    pub signup_data: String,
}

impl std::fmt::Debug for PaymentMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentMeta").field("signup_data", &"<opaque>").finish()
    }
}

/// `data` of a successful checkout creation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentLinkData {
    pub link: String,
}

/// `data` of a transaction verification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionData {
    #[serde(default)]
    pub id: Option<u64>,
    pub status: String,
    pub tx_ref: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
}

impl TransactionData {
    /// The embedded signup payload, if any
    pub fn signup_data(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.signup_data.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct TransactionMeta {
    #[serde(rename = "signupData", default)]
    pub signup_data: Option<String>,
}

impl std::fmt::Debug for TransactionMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionMeta")
            .field("signup_data", &self.signup_data.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}

/// Payment provider seam
///
/// Implement this for each provider. The bundled `FlutterwaveClient` speaks
/// the v3 REST API; `MockPaymentGateway` scripts responses for tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Request a hosted checkout page
    ///
    /// Transport failures and non-2xx answers are `PaymentError::Initiation`.
    async fn initiate_payment(
        &self,
        payload: &PaymentPayload,
    ) -> Result<ProviderResponse<PaymentLinkData>>;

    /// Look a transaction up server-to-server
    ///
    /// Transport failures, timeouts and non-2xx answers are
    /// `PaymentError::Verification`.
    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<ProviderResponse<TransactionData>>;
}
