//! Upgrade policy: pure decisions over a tier and a usage snapshot.

use serde::Serialize;

use crate::tier::{Limit, TierCatalog};

/// Fraction of the message allowance that triggers the upgrade signal.
pub const UPGRADE_PROMPT_THRESHOLD: f64 = 0.8;

/// Point-in-time usage counters for one account.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub messages_used: u32,
    pub skills_used: u32,
}

/// Which allowance tripped the signal. Messages win when both are over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeReason {
    MessageLimit,
    SkillLimit,
}

/// Outcome of the upgrade decision, shaped for the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeSignal {
    pub show: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UpgradeReason>,
    /// Id of the tier immediately above in the individual chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_tier: Option<String>,
}

impl UpgradeSignal {
    fn hidden() -> Self {
        Self {
            show: false,
            reason: None,
            suggested_tier: None,
        }
    }
}

/// Whether one more skill activation fits under `limit`.
///
/// Strict comparison: at `used == limit` the activation is denied.
pub fn can_use_skill(limit: Limit, used: u32) -> bool {
    match limit {
        Limit::Unlimited => true,
        Limit::Count(n) => used < n,
    }
}

/// Remaining skill allowance, floored at zero when counters overshoot.
pub fn skills_remaining(limit: Limit, used: u32) -> Limit {
    match limit {
        Limit::Unlimited => Limit::Unlimited,
        Limit::Count(n) => Limit::Count(n.saturating_sub(used)),
    }
}

/// Decide whether to surface the upgrade signal for `tier_id` at `usage`.
///
/// Messages prompt at 80% of the allowance; skills only once the
/// allowance is fully used. Unknown tiers, unlimited allowances, and
/// tiers without a next step in the individual chain never prompt.
pub fn should_show_upgrade_prompt(
    catalog: &TierCatalog,
    tier_id: &str,
    usage: Usage,
) -> UpgradeSignal {
    let Some(tier) = catalog.get(tier_id) else {
        return UpgradeSignal::hidden();
    };
    let Some(next) = catalog.next_tier(tier_id) else {
        return UpgradeSignal::hidden();
    };

    let reason = if past_message_threshold(tier.messages_per_month, usage.messages_used) {
        Some(UpgradeReason::MessageLimit)
    } else if at_skill_limit(tier.skills_included, usage.skills_used) {
        Some(UpgradeReason::SkillLimit)
    } else {
        None
    };

    match reason {
        Some(reason) => UpgradeSignal {
            show: true,
            reason: Some(reason),
            suggested_tier: Some(next.id.clone()),
        },
        None => UpgradeSignal::hidden(),
    }
}

fn past_message_threshold(limit: Limit, used: u32) -> bool {
    match limit {
        Limit::Unlimited => false,
        Limit::Count(0) => true,
        Limit::Count(n) => f64::from(used) / f64::from(n) >= UPGRADE_PROMPT_THRESHOLD,
    }
}

fn at_skill_limit(limit: Limit, used: u32) -> bool {
    match limit {
        Limit::Unlimited => false,
        Limit::Count(n) => used >= n,
    }
}

/// Display string for a price. `period` carries its own leading
/// separator (`"/month"`), so `format_price(19, "/month")` is
/// `"$19/month"`; zero is `"Free"` regardless of period.
pub fn format_price(price: u32, period: &str) -> String {
    if price == 0 {
        "Free".to_string()
    } else {
        format!("${price}{period}")
    }
}

/// Annual billing quote for a monthly price: two months free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualSavings {
    /// Price for a year paid up front.
    pub annual: u32,
    /// Dollars saved against twelve monthly payments.
    pub savings: u32,
    /// Savings as a rounded percentage of the monthly-billed year.
    pub savings_percent: u32,
}

pub fn annual_savings(monthly: u32) -> AnnualSavings {
    if monthly == 0 {
        return AnnualSavings {
            annual: 0,
            savings: 0,
            savings_percent: 0,
        };
    }
    let full_year = monthly * 12;
    let annual = monthly * 10;
    let savings = full_year - annual;
    let savings_percent = (f64::from(savings) / f64::from(full_year) * 100.0).round() as u32;
    AnnualSavings {
        annual,
        savings,
        savings_percent,
    }
}
