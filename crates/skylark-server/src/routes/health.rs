use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` - liveness check.
///
/// Always `200 OK`: the process being up is what the probe measures. The
/// `checkout` field reports whether the payment provider is configured,
/// so a deploy without `STRIPE_SECRET_KEY` is visible at a glance.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0", "checkout": "ready" }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let checkout = if state.payments.is_some() {
        "ready"
    } else {
        "unconfigured"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "checkout": checkout
    }))
}
