//! Signup Intent and its Correlation Payload
//!
//! A signup is never stored server-side before payment. The form travels to
//! plan selection in the URL, then rides inside the payment provider's
//! transaction metadata as an opaque correlation payload:
//!
//! ```text
//! SignupIntent ──JSON──▶ UTF-8 bytes ──base64──▶ meta.signupData
//!      ▲                                              │
//!      └──────────── decode in the callback ◀─────────┘
//! ```
//!
//! `encode_signup` and `decode_signup` are the two ends of that contract and
//! must stay in lockstep.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{PaymentError, Result};
use crate::plan::Tier;

/// Registration fields collected by the signup form
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: String,

    #[validate(email(message = "email must be a valid email"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 160, message = "organization name must not be empty"))]
    pub organization_name: String,
}

impl SignupForm {
    /// Trim surrounding whitespace from everything but the password
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.organization_name = self.organization_name.trim().to_string();
        self
    }

    /// Normalize and validate in one step
    pub fn validated(self) -> Result<Self> {
        let form = self.normalized();
        form.validate()?;
        Ok(form)
    }

    /// Query string handed to the plan-selection step
    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("name", &self.name)
            .append_pair("email", &self.email)
            .append_pair("password", &self.password)
            .append_pair("organizationName", &self.organization_name)
            .finish()
    }

    pub fn with_tier(self, tier: Tier) -> SignupIntent {
        SignupIntent { form: self, tier }
    }
}

impl std::fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("organization_name", &self.organization_name)
            .finish()
    }
}

/// A prospective tenant's signup plus the chosen tier
///
/// Serialized as `{name, email, password, organizationName, tier}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupIntent {
    #[serde(flatten)]
    pub form: SignupForm,
    pub tier: Tier,
}

impl SignupIntent {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        organization_name: impl Into<String>,
        tier: Tier,
    ) -> Self {
        SignupForm {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            organization_name: organization_name.into(),
        }
        .with_tier(tier)
    }

    pub fn email(&self) -> &str {
        &self.form.email
    }

    /// Normalize and validate the embedded form
    pub fn validated(self) -> Result<Self> {
        Ok(Self { form: self.form.validated()?, tier: self.tier })
    }
}

/// Encode a signup intent as the opaque `meta.signupData` payload
pub fn encode_signup(intent: &SignupIntent) -> Result<String> {
    let json = serde_json::to_vec(intent)
        .map_err(|e| PaymentError::SignupDecode(format!("serialize: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Decode a `meta.signupData` payload back into the signup intent
pub fn decode_signup(payload: &str) -> Result<SignupIntent> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| PaymentError::SignupDecode(format!("base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| PaymentError::SignupDecode(format!("json: {e}")))
}
