use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use skylark_core::{
    checkout::ValidationError,
    upgrade::{should_show_upgrade_prompt, Usage},
};

use crate::{error::AppError, state::AppState};

/// Query parameters for the upgrade probe. Counters default to zero when
/// absent.
#[derive(Debug, Deserialize)]
pub struct UpgradeQuery {
    tier: Option<String>,
    #[serde(default)]
    messages: u32,
    #[serde(default)]
    skills: u32,
}

/// `GET /api/upgrade-check?tier=<id>&messages=<n>&skills=<n>`
///
/// The dashboard polls this to decide whether to show the upgrade
/// banner. Unknown tiers and tiers without a next step answer with the
/// signal hidden rather than an error.
#[tracing::instrument(skip(state, query))]
pub async fn upgrade_check(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UpgradeQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(query) = query.map_err(|_| AppError::InvalidBody)?;
    let tier = query
        .tier
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Validation(ValidationError::MissingField("Tier")))?;

    let signal = should_show_upgrade_prompt(
        &state.catalog,
        tier,
        Usage {
            messages_used: query.messages,
            skills_used: query.skills,
        },
    );
    Ok(Json(json!({ "data": signal })))
}
