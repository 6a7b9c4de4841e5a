//! Server Configuration

use std::time::Duration;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REGISTRATION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LEDGER_RETENTION_DAYS: u64 = 30;
const SECS_PER_DAY: u64 = 86_400;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },

    #[error("{name} must be a positive number of days, got {value:?}")]
    InvalidRetention { name: &'static str, value: String },
}

/// Settings read from the environment at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upper bound on tenant provisioning inside the payment callback
    pub registration_timeout: Duration,
    /// How long the in-memory ledger remembers provisioned payments
    pub ledger_retention: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            registration_timeout: Duration::from_secs(DEFAULT_REGISTRATION_TIMEOUT_SECS),
            ledger_retention: Duration::from_secs(DEFAULT_LEDGER_RETENTION_DAYS * SECS_PER_DAY),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bind_addr = lookup("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let registration_timeout = match positive(&lookup, "REGISTRATION_TIMEOUT_SECS") {
            None => defaults.registration_timeout,
            Some(Ok(secs)) => Duration::from_secs(secs),
            Some(Err(value)) => {
                return Err(ConfigError::InvalidTimeout { name: "REGISTRATION_TIMEOUT_SECS", value });
            }
        };

        let ledger_retention = match positive(&lookup, "LEDGER_RETENTION_DAYS") {
            None => defaults.ledger_retention,
            Some(Ok(days)) => Duration::from_secs(days.saturating_mul(SECS_PER_DAY)),
            Some(Err(value)) => {
                return Err(ConfigError::InvalidRetention { name: "LEDGER_RETENTION_DAYS", value });
            }
        };

        Ok(Self { bind_addr, registration_timeout, ledger_retention })
    }
}

/// `None` when unset, the raw value back when it is not a positive integer
fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<Result<u64, String>> {
    lookup(name).map(|value| match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(value),
    })
}
