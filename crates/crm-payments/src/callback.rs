//! Payment Callback Handler
//!
//! Handles the provider's browser redirect after checkout. The query string
//! is client-controlled, so a tenant is only provisioned after the
//! transaction has been verified server-to-server and its `tx_ref` matches.
//!
//! ```text
//! Entry ──cancelled──────────────────────────────────────────▶ Cancelled
//!   │  ──other / no transaction_id───────────────────────────▶ Fallback
//!   ▼ successful
//! Verifying ──call failed / timed out────────────────────────▶ Error
//!   ▼
//! Validating ──not success / not successful / tx_ref differs─▶ Failed
//!   ▼
//! Provisioning ──no signupData / undecodable─────────────────▶ Error
//!   │          ──already provisioned─────────────────────────▶ LoginSuccess
//!   │          ──claim in flight / registration failed───────▶ Error
//!   ▼
//! LoginSuccess
//! ```

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{PaymentError, Result};
use crate::gateway::{PaymentGateway, ProviderResponse, TransactionData};
use crate::ledger::{Claim, TransactionLedger};
use crate::plan::Tier;
use crate::registration::TenantRegistrar;
use crate::signup::{SignupIntent, decode_signup};

const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect query parameters sent by the provider
#[derive(Clone, Debug, Default)]
pub struct CallbackQuery {
    pub status: Option<String>,
    pub tx_ref: Option<String>,
    pub transaction_id: Option<String>,
}

impl CallbackQuery {
    /// Parse a raw query string, keeping the first value of each key
    ///
    /// Repeated or unknown keys never discard the other parameters.
    pub fn from_query_str(raw: &str) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                "status" => &mut query.status,
                "tx_ref" => &mut query.tx_ref,
                "transaction_id" => &mut query.transaction_id,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }
}

/// The identifiers of a callback that passed the entry check
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentTransactionReference {
    pub tx_ref: String,
    pub transaction_id: String,
    pub status: String,
}

/// Provider transaction after validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedTransaction {
    pub id: Option<u64>,
    pub tx_ref: String,
    pub status: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub signup_data: Option<String>,
}

impl From<TransactionData> for VerifiedTransaction {
    fn from(data: TransactionData) -> Self {
        let signup_data = data.signup_data().map(ToString::to_string);
        Self {
            id: data.id,
            tx_ref: data.tx_ref,
            status: data.status,
            amount: data.amount,
            currency: data.currency,
            signup_data,
        }
    }
}

/// Why a verified transaction was not accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationFailure {
    ProviderStatus(String),
    MissingData,
    TransactionStatus(String),
    TxRefMismatch { expected: String, actual: String },
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderStatus(s) => write!(f, "provider status {s:?}"),
            Self::MissingData => f.write_str("verification response had no data"),
            Self::TransactionStatus(s) => write!(f, "transaction status {s:?}"),
            Self::TxRefMismatch { expected, actual } => {
                write!(f, "tx_ref mismatch: expected {expected:?}, got {actual:?}")
            }
        }
    }
}

/// Check outer status, transaction status and `tx_ref` jointly
pub fn validate_transaction(
    response: ProviderResponse<TransactionData>,
    expected_tx_ref: &str,
) -> std::result::Result<VerifiedTransaction, ValidationFailure> {
    if !response.is_success() {
        return Err(ValidationFailure::ProviderStatus(response.status));
    }
    let data = response.data.ok_or(ValidationFailure::MissingData)?;
    if data.status != "successful" {
        return Err(ValidationFailure::TransactionStatus(data.status));
    }
    if data.tx_ref != expected_tx_ref {
        return Err(ValidationFailure::TxRefMismatch {
            expected: expected_tx_ref.to_string(),
            actual: data.tx_ref,
        });
    }
    Ok(data.into())
}

/// Describe how a verified payment differs from the tier's list price
///
/// `None` when amount and currency match, or when the provider omitted them.
pub fn price_mismatch(
    transaction: &VerifiedTransaction,
    tier: Tier,
    currency: Option<&str>,
) -> Option<String> {
    let expected = tier.pricing().amount;
    let mut problems = Vec::new();

    if let Some(amount) = transaction.amount.filter(|a| *a != expected) {
        problems.push(format!("amount {amount} != {expected}"));
    }
    if let (Some(expected), Some(actual)) = (currency, transaction.currency.as_deref()) {
        if !actual.eq_ignore_ascii_case(expected) {
            problems.push(format!("currency {actual} != {expected}"));
        }
    }

    (!problems.is_empty()).then(|| problems.join(", "))
}

/// Terminal state of a callback, one per redirect destination
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    Cancelled,
    LoginSuccess,
    Failed,
    Error { message: Option<String> },
    Fallback,
}

impl CallbackOutcome {
    fn error(err: &PaymentError) -> Self {
        Self::Error { message: Some(err.user_message().to_string()) }
    }

    /// Relative URL the browser is sent to
    pub fn redirect_path(&self) -> String {
        match self {
            Self::Cancelled => "/pricing?status=cancelled".into(),
            Self::LoginSuccess => "/login?payment=success".into(),
            Self::Failed => "/pricing?status=failed".into(),
            Self::Error { message: Some(message) } => format!(
                "/pricing?status=error&message={}",
                url::form_urlencoded::byte_serialize(message.as_bytes()).collect::<String>()
            ),
            Self::Error { message: None } => "/pricing?status=error".into(),
            Self::Fallback => "/pricing".into(),
        }
    }
}

#[cfg(feature = "axum-handlers")]
impl axum::response::IntoResponse for CallbackOutcome {
    fn into_response(self) -> axum::response::Response {
        axum::response::Redirect::to(&self.redirect_path()).into_response()
    }
}

/// Verifies payments and provisions tenants
pub struct CallbackHandler {
    gateway: Arc<dyn PaymentGateway>,
    registrar: Arc<dyn TenantRegistrar>,
    ledger: Arc<dyn TransactionLedger>,
    verify_timeout: Duration,
    registration_timeout: Duration,
    currency: Option<String>,
}

impl CallbackHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        registrar: Arc<dyn TenantRegistrar>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        Self {
            gateway,
            registrar,
            ledger,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            registration_timeout: DEFAULT_REGISTRATION_TIMEOUT,
            currency: None,
        }
    }

    /// Currency checkouts are created in, for the price anomaly check
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_registration_timeout(mut self, timeout: Duration) -> Self {
        self.registration_timeout = timeout;
        self
    }

    /// Run the callback state machine
    ///
    /// Never fails: every error is logged and turned into an outcome.
    pub async fn handle(&self, query: &CallbackQuery) -> CallbackOutcome {
        let Some(reference) = Self::entry(query) else {
            return match query.status.as_deref() {
                Some("cancelled") => {
                    tracing::info!(tx_ref = ?query.tx_ref, "Checkout cancelled");
                    CallbackOutcome::Cancelled
                }
                status => {
                    tracing::warn!(?status, tx_ref = ?query.tx_ref, "Unrecognised payment callback");
                    CallbackOutcome::Fallback
                }
            };
        };

        match self.process(&reference).await {
            Ok(outcome) => outcome,
            Err(err) => {
                Self::log_failure(&reference, &err);
                CallbackOutcome::error(&err)
            }
        }
    }

    fn entry(query: &CallbackQuery) -> Option<PaymentTransactionReference> {
        if query.status.as_deref() != Some("successful") {
            return None;
        }
        let transaction_id = query.transaction_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;

        Some(PaymentTransactionReference {
            tx_ref: query.tx_ref.clone().unwrap_or_default(),
            transaction_id: transaction_id.to_string(),
            status: "successful".into(),
        })
    }

    async fn process(&self, reference: &PaymentTransactionReference) -> Result<CallbackOutcome> {
        let response = tokio::time::timeout(
            self.verify_timeout,
            self.gateway.verify_transaction(&reference.transaction_id),
        )
        .await
        .map_err(|_| PaymentError::Timeout("transaction verification".into()))??;

        let transaction = match validate_transaction(response, &reference.tx_ref) {
            Ok(transaction) => transaction,
            Err(failure) => {
                tracing::warn!(
                    transaction_id = %reference.transaction_id,
                    tx_ref = %reference.tx_ref,
                    reason = %failure,
                    "Payment validation failed"
                );
                return Ok(CallbackOutcome::Failed);
            }
        };

        let payload = transaction.signup_data.as_deref().ok_or(PaymentError::MissingSignupMetadata)?;
        let intent = decode_signup(payload)?;

        if let Some(mismatch) = price_mismatch(&transaction, intent.tier, self.currency.as_deref()) {
            tracing::warn!(
                transaction_id = %reference.transaction_id,
                tx_ref = %reference.tx_ref,
                tier = %intent.tier,
                mismatch = %mismatch,
                anomaly = true,
                "Verified payment does not match the tier price"
            );
        }

        match self.ledger.claim(&reference.transaction_id, &reference.tx_ref)? {
            Claim::Acquired => {}
            Claim::AlreadyCompleted => {
                tracing::info!(
                    transaction_id = %reference.transaction_id,
                    "Transaction already provisioned, skipping registration"
                );
                return Ok(CallbackOutcome::LoginSuccess);
            }
            Claim::InFlight => {
                return Err(PaymentError::AlreadyProcessing(reference.transaction_id.clone()));
            }
        }

        self.provision(reference, &intent).await
    }

    async fn provision(
        &self,
        reference: &PaymentTransactionReference,
        intent: &SignupIntent,
    ) -> Result<CallbackOutcome> {
        let registered = tokio::time::timeout(self.registration_timeout, self.registrar.register(intent))
            .await
            .map_err(|_| PaymentError::Timeout("tenant registration".into()))
            .and_then(|result| result);

        let tenant = match registered {
            Ok(tenant) => tenant,
            Err(err) => {
                tracing::error!(
                    transaction_id = %reference.transaction_id,
                    tx_ref = %reference.tx_ref,
                    email = %intent.email(),
                    error = %err,
                    reconcile = true,
                    "Payment succeeded but tenant registration failed"
                );
                if let Err(release_err) = self.ledger.release(&reference.transaction_id) {
                    tracing::error!(
                        transaction_id = %reference.transaction_id,
                        error = %release_err,
                        "Failed to release transaction claim"
                    );
                }
                return Err(err);
            }
        };

        if let Err(err) = self.ledger.complete(&reference.transaction_id, tenant.organization.id) {
            tracing::error!(
                transaction_id = %reference.transaction_id,
                organization_id = %tenant.organization.id,
                error = %err,
                "Tenant registered but ledger update failed"
            );
        }

        tracing::info!(
            transaction_id = %reference.transaction_id,
            tx_ref = %reference.tx_ref,
            organization_id = %tenant.organization.id,
            tier = %intent.tier,
            "Signup payment verified and tenant provisioned"
        );
        Ok(CallbackOutcome::LoginSuccess)
    }

    fn log_failure(reference: &PaymentTransactionReference, err: &PaymentError) {
        match err {
            PaymentError::MissingSignupMetadata | PaymentError::SignupDecode(_) => tracing::error!(
                transaction_id = %reference.transaction_id,
                tx_ref = %reference.tx_ref,
                error = %err,
                "Verified payment carries no usable signup data"
            ),
            PaymentError::AlreadyProcessing(_) => tracing::warn!(
                transaction_id = %reference.transaction_id,
                "Duplicate callback while transaction is being provisioned"
            ),
            _ => tracing::warn!(
                transaction_id = %reference.transaction_id,
                tx_ref = %reference.tx_ref,
                error = %err,
                "Payment callback failed"
            ),
        }
    }
}
