//! Mock Payment Gateway
//!
//! For tests and local demos. Records every call and answers from a script.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    PaymentGateway, PaymentLinkData, PaymentPayload, ProviderResponse, TransactionData,
    TransactionMeta,
};
use crate::error::{PaymentError, Result};

#[derive(Clone, Debug)]
enum Scripted<T> {
    Respond(ProviderResponse<T>),
    Fail(String),
}

/// Scripted gateway with a default happy path
///
/// Checkout creation succeeds with a fake hosted link unless told otherwise.
/// Verification fails unless a transaction was scripted or produced by
/// `complete_checkout`.
pub struct MockPaymentGateway {
    initiate_with: Mutex<Option<Scripted<PaymentLinkData>>>,
    transactions: Mutex<HashMap<String, Scripted<TransactionData>>>,
    initiations: Mutex<Vec<PaymentPayload>>,
    verifications: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            initiate_with: Mutex::new(None),
            transactions: Mutex::new(HashMap::new()),
            initiations: Mutex::new(Vec::new()),
            verifications: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1_000_001),
        }
    }

    /// Answer checkout creation with a provider-level error envelope
    pub fn reject_initiation(&self, message: impl Into<String>) {
        *lock(&self.initiate_with) = Some(Scripted::Respond(ProviderResponse::error(message)));
    }

    /// Make checkout creation fail at the transport level
    pub fn fail_initiation(&self, message: impl Into<String>) {
        *lock(&self.initiate_with) = Some(Scripted::Fail(message.into()));
    }

    /// Script the verification answer for a transaction id
    pub fn set_transaction(
        &self,
        transaction_id: impl Into<String>,
        response: ProviderResponse<TransactionData>,
    ) {
        lock(&self.transactions).insert(transaction_id.into(), Scripted::Respond(response));
    }

    /// Make verification of a transaction id fail at the transport level
    pub fn fail_verification(&self, transaction_id: impl Into<String>, message: impl Into<String>) {
        lock(&self.transactions).insert(transaction_id.into(), Scripted::Fail(message.into()));
    }

    /// Simulate the customer paying for a checkout created earlier
    ///
    /// Returns the provider transaction id, or `None` if no checkout with
    /// that `tx_ref` was initiated.
    pub fn complete_checkout(&self, tx_ref: &str) -> Option<String> {
        let payload = lock(&self.initiations).iter().find(|p| p.tx_ref == tx_ref).cloned()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let data = TransactionData {
            id: Some(id),
            status: "successful".into(),
            tx_ref: payload.tx_ref,
            amount: Some(payload.amount),
            currency: Some(payload.currency),
            meta: Some(TransactionMeta { signup_data: Some(payload.meta.signup_data) }),
        };
        self.set_transaction(id.to_string(), ProviderResponse::success(data));
        Some(id.to_string())
    }

    /// Checkout payloads received so far
    pub fn initiations(&self) -> Vec<PaymentPayload> {
        lock(&self.initiations).clone()
    }

    /// Transaction ids verified so far
    pub fn verifications(&self) -> Vec<String> {
        lock(&self.verifications).clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn name(&self) -> &str {
        "MockGateway"
    }

    async fn initiate_payment(
        &self,
        payload: &PaymentPayload,
    ) -> Result<ProviderResponse<PaymentLinkData>> {
        lock(&self.initiations).push(payload.clone());

        match lock(&self.initiate_with).clone() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(PaymentError::Initiation(message)),
            None => Ok(ProviderResponse::success(PaymentLinkData {
                link: format!("https://checkout.mock/pay/{}", payload.tx_ref),
            })),
        }
    }

    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<ProviderResponse<TransactionData>> {
        lock(&self.verifications).push(transaction_id.to_string());

        match lock(&self.transactions).get(transaction_id).cloned() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(PaymentError::Verification(message)),
            None => Err(PaymentError::Verification(format!(
                "provider returned 404 Not Found for transaction {transaction_id}"
            ))),
        }
    }
}
