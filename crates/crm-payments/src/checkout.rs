//! Payment Link Builder
//!
//! Creates a hosted checkout for a signup that has not been persisted yet.
//! The signup itself is carried by the provider as `meta.signupData`.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use url::Url;

use crate::error::{PaymentError, Result};
use crate::gateway::{Customizations, PaymentCustomer, PaymentGateway, PaymentMeta, PaymentPayload};
use crate::plan::Tier;
use crate::signup::{SignupIntent, encode_signup};
use crate::tx_ref::TxRef;

/// Path the provider redirects back to after checkout
pub const CALLBACK_PATH: &str = "/payment/callback";

/// Checkout settings
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Public origin of this service, used to build the redirect URL
    pub public_base_url: Url,
    pub currency: String,
    pub tx_ref_prefix: String,
    pub title: String,
    pub logo_url: Option<String>,
}

impl CheckoutConfig {
    pub fn new(public_base_url: &str) -> Result<Self> {
        let public_base_url = Url::parse(public_base_url)
            .map_err(|e| PaymentError::Config(format!("PUBLIC_BASE_URL is not a URL: {e}")))?;

        Ok(Self {
            public_base_url,
            currency: "NGN".into(),
            tx_ref_prefix: "crm".into(),
            title: "CRM Subscription".into(),
            logo_url: None,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base = std::env::var("PUBLIC_BASE_URL")
            .map_err(|_| PaymentError::Config("PUBLIC_BASE_URL not set".into()))?;

        let mut config = Self::new(&base)?;
        if let Ok(currency) = std::env::var("PAYMENT_CURRENCY") {
            config.currency = currency.to_uppercase();
        }
        if let Ok(prefix) = std::env::var("TX_REF_PREFIX") {
            config.tx_ref_prefix = prefix;
        }
        if let Ok(title) = std::env::var("CHECKOUT_TITLE") {
            config.title = title;
        }
        config.logo_url = std::env::var("CHECKOUT_LOGO_URL").ok().filter(|l| !l.is_empty());
        Ok(config)
    }

    /// Absolute URL of the callback endpoint
    pub fn redirect_url(&self) -> Result<Url> {
        self.public_base_url
            .join(CALLBACK_PATH)
            .map_err(|e| PaymentError::Config(format!("cannot build redirect URL: {e}")))
    }
}

/// A hosted checkout ready for redirection
#[derive(Clone, Debug, Serialize)]
pub struct CheckoutLink {
    pub url: String,
    pub tx_ref: TxRef,
    pub tier: Tier,
    pub amount: Decimal,
}

/// Builds provider checkout requests for signups
pub struct PaymentLinkBuilder {
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
}

impl PaymentLinkBuilder {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: CheckoutConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Create a checkout at the tier's list price
    pub async fn create_for_tier(&self, intent: &SignupIntent) -> Result<CheckoutLink> {
        self.create_link(intent, intent.tier.pricing().amount).await
    }

    /// Create a checkout for `amount`, returning the hosted page URL
    ///
    /// Any failure is a `PaymentError::Initiation`; the caller must not
    /// redirect on that path.
    pub async fn create_link(&self, intent: &SignupIntent, amount: Decimal) -> Result<CheckoutLink> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Initiation(format!("amount must be positive, got {amount}")));
        }

        let tx_ref = TxRef::generate(&self.config.tx_ref_prefix, intent.tier);
        let payload = self.build_payload(intent, amount, &tx_ref).map_err(into_initiation)?;

        tracing::info!(
            tx_ref = %tx_ref,
            tier = %intent.tier,
            amount = %amount,
            currency = %self.config.currency,
            gateway = self.gateway.name(),
            "Creating checkout"
        );

        let response = self.gateway.initiate_payment(&payload).await.map_err(|e| {
            tracing::error!(tx_ref = %tx_ref, error = %e, "Checkout initiation failed");
            into_initiation(e)
        })?;

        if !response.is_success() {
            let message = response
                .message
                .unwrap_or_else(|| "payment provider rejected the request".into());
            tracing::error!(tx_ref = %tx_ref, message = %message, "Checkout rejected by provider");
            return Err(PaymentError::Initiation(message));
        }

        let url = response
            .data
            .map(|d| d.link)
            .filter(|link| !link.is_empty())
            .ok_or_else(|| PaymentError::Initiation("no checkout link returned".into()))?;

        Ok(CheckoutLink { url, tx_ref, tier: intent.tier, amount })
    }

    fn build_payload(
        &self,
        intent: &SignupIntent,
        amount: Decimal,
        tx_ref: &TxRef,
    ) -> Result<PaymentPayload> {
        let pricing = intent.tier.pricing();

        Ok(PaymentPayload {
            tx_ref: tx_ref.to_string(),
            amount,
            currency: self.config.currency.clone(),
            redirect_url: self.config.redirect_url()?.to_string(),
            customer: PaymentCustomer {
                email: intent.form.email.clone(),
                name: intent.form.name.clone(),
            },
            customizations: Customizations {
                title: self.config.title.clone(),
                description: format!(
                    "{} plan for {}",
                    pricing.name, intent.form.organization_name
                ),
                logo: self.config.logo_url.clone(),
            },
            meta: PaymentMeta { signup_data: encode_signup(intent)? },
        })
    }
}

fn into_initiation(err: PaymentError) -> PaymentError {
    match err {
        PaymentError::Initiation(_) => err,
        other => PaymentError::Initiation(other.to_string()),
    }
}
