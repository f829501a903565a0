use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::json;

use skylark_core::{
    tier::Tier,
    upgrade::{annual_savings, format_price, AnnualSavings},
};

use crate::state::AppState;

/// One catalog entry as the pricing page consumes it: the tier record
/// plus display annotations computed server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TierListing {
    #[serde(flatten)]
    tier: Tier,
    price_formatted: String,
    annual: AnnualSavings,
}

/// `GET /api/tiers` - the full catalog for the pricing page.
///
/// Ordering follows the catalog (ascending price). Free tiers carry an
/// all-zero `annual` block.
#[tracing::instrument(skip(state))]
pub async fn list_tiers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let listings: Vec<TierListing> = state
        .catalog
        .tiers()
        .iter()
        .map(|tier| TierListing {
            price_formatted: format_price(tier.price, "/month"),
            annual: annual_savings(tier.price),
            tier: tier.clone(),
        })
        .collect();
    Json(json!({ "data": listings }))
}
