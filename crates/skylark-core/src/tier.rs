//! Subscription tier catalog.
//!
//! The catalog is a declarative table plus pure lookups. Every invariant
//! the rest of the system leans on (ascending prices, whitelisted price
//! ids, a single popular tier) is checked once when the table is built,
//! not re-derived per request.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::PriceIds;

/// Prefix every external payment-plan identifier must carry.
pub const PRICE_ID_PREFIX: &str = "price_";

/// The individual upgrade chain, cheapest first. `family` and `team` sit
/// outside it and have no next tier.
pub const INDIVIDUAL_CHAIN: [&str; 4] = ["free", "personal", "plus", "pro"];

/// A per-month allowance: a concrete count or the unlimited sentinel.
///
/// Serialized as the number itself or the string `"unlimited"`, which is
/// the shape the dashboard and pricing page consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u32),
    Unlimited,
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Count(n) => serializer.serialize_u32(*n),
            Limit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Count(n) => write!(f, "{n}"),
            Limit::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// One subscription tier. Immutable once the catalog is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub id: String,
    pub name: String,
    /// Whole dollars per month.
    pub price: u32,
    /// External payment-plan identifier. Paid tiers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
    pub messages_per_month: Limit,
    pub skills_included: Limit,
    pub features: Vec<String>,
    pub popular: bool,
    pub highlighted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tier catalog is not ordered by ascending price at '{0}'")]
    PriceOrder(String),
    #[error("individual chain tier '{0}' is missing from the catalog")]
    MissingChainTier(&'static str),
    #[error("paid tier '{0}' has a missing or malformed price id")]
    BadPriceId(String),
    #[error("free tier '{0}' must not carry a price id")]
    UnexpectedPriceId(String),
    #[error("price id '{0}' is assigned to more than one tier")]
    DuplicatePriceId(String),
    #[error("catalog must have exactly one popular tier, found {0}")]
    PopularCount(usize),
    #[error("tier '{0}' badge does not match its popular/highlighted flags")]
    BadgeMismatch(String),
}

/// Check the external payment-plan id shape: the fixed prefix followed by
/// one or more ASCII alphanumerics.
pub fn is_valid_price_id_format(raw: &str) -> bool {
    match raw.strip_prefix(PRICE_ID_PREFIX) {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric()),
        None => false,
    }
}

/// The static tier table with its lookup functions.
#[derive(Debug, Clone)]
pub struct TierCatalog {
    tiers: Vec<Tier>,
}

impl TierCatalog {
    /// Build the catalog with the given payment-plan ids and run the
    /// load-time invariant checks.
    pub fn from_price_ids(price_ids: &PriceIds) -> Result<Self, CatalogError> {
        let catalog = Self {
            tiers: build_table(price_ids),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Exact lookup by tier id. Empty or unknown ids yield `None`.
    pub fn get(&self, id: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.id == id)
    }

    /// Exact lookup by external payment-plan id. Empty strings yield
    /// `None` without scanning.
    pub fn get_by_price_id(&self, price_id: &str) -> Option<&Tier> {
        if price_id.is_empty() {
            return None;
        }
        self.tiers
            .iter()
            .find(|tier| tier.price_id.as_deref() == Some(price_id))
    }

    /// The tier immediately above `id` in the individual chain.
    ///
    /// `None` for the top of the chain (`pro`), for the non-chained tracks
    /// (`family`, `team`), and for unknown ids.
    pub fn next_tier(&self, id: &str) -> Option<&Tier> {
        let pos = INDIVIDUAL_CHAIN.iter().position(|chain_id| *chain_id == id)?;
        let next_id = INDIVIDUAL_CHAIN.get(pos + 1)?;
        self.get(next_id)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        // Whole table ascends by price. The individual chain is checked on
        // its own so the upgrade path stays monotonic even if the table is
        // ever reordered.
        for pair in self.tiers.windows(2) {
            if pair[1].price < pair[0].price {
                return Err(CatalogError::PriceOrder(pair[1].id.clone()));
            }
        }

        let mut previous_price = 0u32;
        for chain_id in INDIVIDUAL_CHAIN {
            let tier = self
                .get(chain_id)
                .ok_or(CatalogError::MissingChainTier(chain_id))?;
            if tier.price < previous_price {
                return Err(CatalogError::PriceOrder(tier.id.clone()));
            }
            previous_price = tier.price;
        }

        let mut seen_price_ids: Vec<&str> = Vec::new();
        for tier in &self.tiers {
            match (&tier.price_id, tier.price) {
                (None, 0) => {}
                (Some(_), 0) => return Err(CatalogError::UnexpectedPriceId(tier.id.clone())),
                (None, _) => return Err(CatalogError::BadPriceId(tier.id.clone())),
                (Some(price_id), _) => {
                    if !is_valid_price_id_format(price_id) {
                        return Err(CatalogError::BadPriceId(tier.id.clone()));
                    }
                    if seen_price_ids.contains(&price_id.as_str()) {
                        return Err(CatalogError::DuplicatePriceId(price_id.clone()));
                    }
                    seen_price_ids.push(price_id);
                }
            }
        }

        let popular = self.tiers.iter().filter(|tier| tier.popular).count();
        if popular != 1 {
            return Err(CatalogError::PopularCount(popular));
        }

        for tier in &self.tiers {
            let needs_badge = tier.popular || tier.highlighted;
            let has_badge = tier.badge.as_deref().is_some_and(|b| !b.is_empty());
            if needs_badge != has_badge {
                return Err(CatalogError::BadgeMismatch(tier.id.clone()));
            }
        }

        Ok(())
    }
}

fn features(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn build_table(price_ids: &PriceIds) -> Vec<Tier> {
    vec![
        Tier {
            id: "free".to_string(),
            name: "Free".to_string(),
            price: 0,
            price_id: None,
            messages_per_month: Limit::Count(50),
            skills_included: Limit::Count(1),
            features: features(&[
                "50 messages per month",
                "1 skill",
                "Community support",
            ]),
            popular: false,
            highlighted: false,
            badge: None,
        },
        Tier {
            id: "personal".to_string(),
            name: "Personal".to_string(),
            price: 9,
            price_id: Some(price_ids.personal.clone()),
            messages_per_month: Limit::Count(1_000),
            skills_included: Limit::Count(5),
            features: features(&[
                "1,000 messages per month",
                "5 skills",
                "Conversation history",
                "Email support",
            ]),
            popular: false,
            highlighted: false,
            badge: None,
        },
        Tier {
            id: "plus".to_string(),
            name: "Plus".to_string(),
            price: 19,
            price_id: Some(price_ids.plus.clone()),
            messages_per_month: Limit::Count(5_000),
            skills_included: Limit::Count(25),
            features: features(&[
                "5,000 messages per month",
                "25 skills",
                "Priority responses",
                "Custom skill settings",
                "Email support",
            ]),
            popular: true,
            highlighted: false,
            badge: Some("Most Popular".to_string()),
        },
        Tier {
            id: "family".to_string(),
            name: "Family".to_string(),
            price: 29,
            price_id: Some(price_ids.family.clone()),
            messages_per_month: Limit::Count(10_000),
            skills_included: Limit::Count(25),
            features: features(&[
                "Up to 5 members",
                "10,000 shared messages per month",
                "25 skills",
                "Parental controls",
                "Email support",
            ]),
            popular: false,
            highlighted: false,
            badge: None,
        },
        Tier {
            id: "pro".to_string(),
            name: "Pro".to_string(),
            price: 39,
            price_id: Some(price_ids.pro.clone()),
            messages_per_month: Limit::Unlimited,
            skills_included: Limit::Unlimited,
            features: features(&[
                "Unlimited messages",
                "Unlimited skills",
                "Priority responses",
                "Early access to new skills",
                "Priority support",
            ]),
            popular: false,
            highlighted: false,
            badge: None,
        },
        Tier {
            id: "team".to_string(),
            name: "Team".to_string(),
            price: 49,
            price_id: Some(price_ids.team.clone()),
            messages_per_month: Limit::Unlimited,
            skills_included: Limit::Unlimited,
            features: features(&[
                "Per seat, minimum 3 seats",
                "Unlimited messages",
                "Unlimited skills",
                "Shared skill library",
                "Centralized billing",
                "Priority support",
            ]),
            popular: false,
            highlighted: true,
            badge: Some("For Teams".to_string()),
        },
    ]
}
