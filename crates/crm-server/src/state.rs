//! Application State

use std::sync::Arc;

use crm_core::FlowRunner;
use crm_payments::{CallbackHandler, PaymentLinkBuilder};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Runs AI flows against the configured model
    pub runner: FlowRunner,

    /// Payment link builder (optional - None if payments are not configured)
    pub link_builder: Option<Arc<PaymentLinkBuilder>>,

    /// Payment callback handler (optional - None if payments are not configured)
    pub callback: Option<Arc<CallbackHandler>>,
}

impl AppState {
    pub const fn payments_configured(&self) -> bool {
        self.link_builder.is_some() && self.callback.is_some()
    }
}
