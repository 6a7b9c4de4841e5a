//! Subscription Tiers

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Subscription plan tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Starter,
    Growth,
    Enterprise,
}

impl Tier {
    pub const ALL: [Self; 3] = [Self::Starter, Self::Growth, Self::Enterprise];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Growth => "growth",
            Self::Enterprise => "enterprise",
        }
    }

    /// Seats included in the plan
    pub const fn seats(self) -> u32 {
        match self {
            Self::Starter => 3,
            Self::Growth => 15,
            Self::Enterprise => 100,
        }
    }

    /// Get pricing for this tier
    pub fn pricing(self) -> PlanPricing {
        match self {
            Self::Starter => PlanPricing {
                tier: self,
                name: "Starter".into(),
                description: "Contacts, deals and leads for small teams".into(),
                amount: dec!(15000),
                interval: BillingInterval::Monthly,
            },
            Self::Growth => PlanPricing {
                tier: self,
                name: "Growth".into(),
                description: "AI lead scoring, email drafting and dashboard insights".into(),
                amount: dec!(45000),
                interval: BillingInterval::Monthly,
            },
            Self::Enterprise => PlanPricing {
                tier: self,
                name: "Enterprise".into(),
                description: "Unlimited pipelines, priority support, custom onboarding".into(),
                amount: dec!(120000),
                interval: BillingInterval::Monthly,
            },
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starter" => Ok(Self::Starter),
            "growth" => Ok(Self::Growth),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(PaymentError::UnknownTier(other.to_string())),
        }
    }
}

/// Billing interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
}

/// Pricing information, amounts in major currency units
#[derive(Clone, Debug, Serialize)]
pub struct PlanPricing {
    pub tier: Tier,
    pub name: String,
    pub description: String,
    pub amount: Decimal,
    pub interval: BillingInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_pricing() {
        let pricing = Tier::Growth.pricing();
        assert_eq!(pricing.amount, dec!(45000));
        assert_eq!(pricing.interval, BillingInterval::Monthly);
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("Enterprise".parse::<Tier>().unwrap(), Tier::Enterprise);
        assert!(matches!("platinum".parse::<Tier>(), Err(PaymentError::UnknownTier(_))));
    }

    #[test]
    fn test_prices_increase_with_tier() {
        let amounts: Vec<Decimal> = Tier::ALL.iter().map(|t| t.pricing().amount).collect();
        assert!(amounts.windows(2).all(|w| w[0] < w[1]));
    }
}
