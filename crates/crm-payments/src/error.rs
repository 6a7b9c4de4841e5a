//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors raised along the signup payment flow
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Provider rejected or was unreachable while creating a checkout
    #[error("Payment initiation failed: {0}")]
    Initiation(String),

    /// Server-to-server transaction verification failed
    #[error("Transaction verification failed: {0}")]
    Verification(String),

    /// A verified transaction carried no signup data
    #[error("Signup data not found in transaction metadata")]
    MissingSignupMetadata,

    /// Signup data present but not decodable
    #[error("Signup data could not be decoded: {0}")]
    SignupDecode(String),

    /// Tenant provisioning failed after payment. The message is safe to show.
    #[error("Tenant registration failed: {0}")]
    Registration(String),

    /// Signup fields failed validation
    #[error("Invalid signup: {0}")]
    InvalidSignup(String),

    /// Unknown subscription tier
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    /// Another callback for the same transaction is still provisioning
    #[error("Transaction already being processed: {0}")]
    AlreadyProcessing(String),

    /// Outbound call exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::Initiation(_) => "We couldn't start your payment. Please try again.",
            Self::Verification(_) => {
                "We couldn't verify your payment. Please contact support if you were charged."
            }
            Self::MissingSignupMetadata => "Signup data not found",
            Self::SignupDecode(_) => "Signup data could not be read",
            Self::Registration(msg) => msg,
            Self::InvalidSignup(_) => "Please check your signup details.",
            Self::UnknownTier(_) => "The selected plan is not available.",
            Self::AlreadyProcessing(_) => "This payment is already being processed.",
            Self::Timeout(_) => "The request timed out. Please try again.",
            Self::Config(_) => "Service configuration error.",
            Self::Storage(_) => "An error occurred processing your request.",
        }
    }
}

impl From<validator::ValidationErrors> for PaymentError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(ToString::to_string).collect();
        fields.sort_unstable();
        Self::InvalidSignup(format!("invalid fields: {}", fields.join(", ")))
    }
}
