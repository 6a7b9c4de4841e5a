//! Tenant Registration
//!
//! Provisions the organization, its first admin user and a default company
//! profile once a payment has been verified.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::plan::Tier;
use crate::signup::SignupIntent;

/// A tenant of the CRM
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// URL-safe unique handle derived from the name
    pub slug: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Member,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    /// PHC-format argon2 hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
}

/// Company settings created alongside the organization
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub organization_id: Uuid,
    pub display_name: String,
    pub currency: String,
    pub timezone: String,
    pub seats: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredTenant {
    pub organization: Organization,
    pub admin: AdminUser,
    pub profile: CompanyProfile,
}

/// Tenant provisioning seam
#[async_trait]
pub trait TenantRegistrar: Send + Sync {
    /// Create a tenant for a paid signup
    ///
    /// Failures are `PaymentError::Registration` with a message safe to show
    /// the customer.
    async fn register(&self, intent: &SignupIntent) -> Result<RegisteredTenant>;
}

#[derive(Default)]
struct Tenants {
    organizations: HashMap<Uuid, Organization>,
    admins: HashMap<String, AdminUser>,
    profiles: HashMap<Uuid, CompanyProfile>,
}

/// In-memory registrar (for development)
pub struct MemoryTenantRegistrar {
    tenants: RwLock<Tenants>,
    default_currency: String,
}

impl Default for MemoryTenantRegistrar {
    fn default() -> Self {
        Self::new("NGN")
    }
}

impl MemoryTenantRegistrar {
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self { tenants: RwLock::new(Tenants::default()), default_currency: default_currency.into() }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tenants>> {
        self.tenants.read().map_err(|_| PaymentError::Storage("tenant store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tenants>> {
        self.tenants.write().map_err(|_| PaymentError::Storage("tenant store lock poisoned".into()))
    }

    pub fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        Ok(self.read()?.admins.get(&email.trim().to_lowercase()).cloned())
    }

    pub fn get_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }

    pub fn get_profile(&self, organization_id: Uuid) -> Result<Option<CompanyProfile>> {
        Ok(self.read()?.profiles.get(&organization_id).cloned())
    }

    pub fn organization_count(&self) -> Result<usize> {
        Ok(self.read()?.organizations.len())
    }
}

#[async_trait]
impl TenantRegistrar for MemoryTenantRegistrar {
    async fn register(&self, intent: &SignupIntent) -> Result<RegisteredTenant> {
        let intent = intent.clone().validated()?;
        let email = intent.form.email.to_lowercase();

        if self.read()?.admins.contains_key(&email) {
            return Err(duplicate_email());
        }

        let password = intent.form.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| PaymentError::Storage(format!("hashing task failed: {e}")))??;

        let mut tenants = self.write()?;
        if tenants.admins.contains_key(&email) {
            return Err(duplicate_email());
        }

        let organization = Organization {
            id: Uuid::new_v4(),
            name: intent.form.organization_name.clone(),
            slug: unique_slug(&intent.form.organization_name, &tenants.organizations),
            tier: intent.tier,
            created_at: Utc::now(),
        };
        let admin = AdminUser {
            id: Uuid::new_v4(),
            organization_id: organization.id,
            name: intent.form.name.clone(),
            email: email.clone(),
            password_hash,
            role: UserRole::Admin,
        };
        let profile = CompanyProfile {
            organization_id: organization.id,
            display_name: organization.name.clone(),
            currency: self.default_currency.clone(),
            timezone: "UTC".into(),
            seats: intent.tier.seats(),
        };

        tenants.organizations.insert(organization.id, organization.clone());
        tenants.admins.insert(email, admin.clone());
        tenants.profiles.insert(organization.id, profile.clone());

        tracing::info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            tier = %organization.tier,
            "Tenant registered"
        );

        Ok(RegisteredTenant { organization, admin, profile })
    }
}

fn duplicate_email() -> PaymentError {
    PaymentError::Registration("An account with this email already exists".into())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PaymentError::Storage(format!("password hash error: {e}")))
}

/// Lowercase ASCII alphanumerics with single dashes between words
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() { "org".to_string() } else { slug.to_string() }
}

fn unique_slug(name: &str, existing: &HashMap<Uuid, Organization>) -> String {
    let base = slugify(name);
    let taken = |candidate: &str| existing.values().any(|o| o.slug == candidate);

    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}
