//! Transaction Correlation References

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::Tier;

/// Correlates a checkout session with the signup that started it
///
/// Formatted `{prefix}-{tier}-{unix_millis}-{suffix}`. The random suffix keeps
/// two references minted in the same millisecond for the same tier apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    /// Generate a new reference
    pub fn generate(prefix: &str, tier: Tier) -> Self {
        Self::generate_at(prefix, tier, Utc::now())
    }

    fn generate_at(prefix: &str, tier: Tier, at: DateTime<Utc>) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}-{}-{}",
            prefix,
            tier.as_str(),
            at.timestamp_millis(),
            &suffix[..12]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for TxRef {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let tx_ref = TxRef::generate_at("crm", Tier::Growth, at);
        let prefix = format!("crm-growth-{}-", at.timestamp_millis());
        assert!(tx_ref.as_str().starts_with(&prefix));
        assert_eq!(tx_ref.as_str().len(), prefix.len() + 12);
    }

    #[test]
    fn test_unique_within_same_millisecond() {
        let at = Utc::now();
        let refs: HashSet<TxRef> =
            (0..1000).map(|_| TxRef::generate_at("crm", Tier::Starter, at)).collect();
        assert_eq!(refs.len(), 1000);
    }
}
