//! # crm-payments
//!
//! Paid signup for the CRM: checkout creation, payment verification and
//! tenant provisioning.
//!
//! ## Flow
//!
//! Nothing about a signup is stored server-side until the payment clears.
//! The form rides to the provider inside the checkout metadata and comes
//! back with the verified transaction.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ Plan select  │────▶│  Provider hosted │────▶│ /payment/callback│
//! │ (link build) │     │  checkout page   │     │ verify+provision │
//! └──────────────┘     └──────────────────┘     └──────────────────┘
//!        │                                               │
//!        └──── meta.signupData (base64 JSON) ────────────┘
//! ```
//!
//! The redirect back is client-controlled. `CallbackHandler` trusts only
//! the server-to-server verification and the `tx_ref` match, and records
//! each provisioned transaction in a `TransactionLedger` so replays do not
//! create a second tenant.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crm_payments::{
//!     CallbackHandler, CheckoutConfig, FlutterwaveClient, MemoryTenantRegistrar,
//!     MemoryTransactionLedger, PaymentLinkBuilder, SignupIntent, Tier,
//! };
//!
//! let gateway = Arc::new(FlutterwaveClient::from_env()?);
//! let builder = PaymentLinkBuilder::new(gateway.clone(), CheckoutConfig::from_env()?);
//!
//! let intent = SignupIntent::new("Ada", "ada@example.com", "hunter22", "Ada Co", Tier::Growth);
//! let link = builder.create_for_tier(&intent).await?;
//! // Redirect user to: link.url
//!
//! let callback = CallbackHandler::new(
//!     gateway,
//!     Arc::new(MemoryTenantRegistrar::default()),
//!     Arc::new(MemoryTransactionLedger::new()),
//! );
//! let outcome = callback.handle(&query).await;
//! // Redirect user to: outcome.redirect_path()
//! ```

mod callback;
mod checkout;
mod error;
pub mod gateway;
mod ledger;
mod plan;
mod registration;
mod signup;
mod tx_ref;

pub use callback::{
    CallbackHandler, CallbackOutcome, CallbackQuery, PaymentTransactionReference,
    ValidationFailure, VerifiedTransaction, price_mismatch, validate_transaction,
};
pub use checkout::{CALLBACK_PATH, CheckoutConfig, CheckoutLink, PaymentLinkBuilder};
pub use error::{PaymentError, Result};
pub use gateway::{FlutterwaveClient, GatewayConfig, MockPaymentGateway, PaymentGateway};
pub use ledger::{Claim, EntryState, LedgerEntry, MemoryTransactionLedger, TransactionLedger};
pub use plan::{BillingInterval, PlanPricing, Tier};
pub use registration::{
    AdminUser, CompanyProfile, MemoryTenantRegistrar, Organization, RegisteredTenant,
    TenantRegistrar, UserRole, slugify,
};
pub use signup::{SignupForm, SignupIntent, decode_signup, encode_signup};
pub use tx_ref::TxRef;
