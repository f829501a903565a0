use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use skylark_billing::{CheckoutSession, CreateSessionParams};
use skylark_core::checkout::{
    validate_get_request, validate_post_request, CheckoutPayload, CheckoutRequest,
    TRIAL_PERIOD_DAYS,
};

use crate::{error::AppError, ratelimit, state::AppState};

/// Query parameters for the redirect flow.
#[derive(Debug, Deserialize)]
pub struct CheckoutParams {
    price: Option<String>,
    source: Option<String>,
}

/// Body returned by the subscribe flow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub session_id: String,
    pub url: String,
}

/// `GET /checkout?price=<priceId>[&source=<tag>]` - anonymous checkout.
///
/// ## Flow
/// Rate limit, validate the price id against the catalog, create a
/// provider session, then 307 to the hosted payment page. Failures come
/// back as JSON errors, same shape as the POST path.
///
/// ## Rate limiting
/// 10 requests per minute per client IP; beyond that 429 with a
/// `Retry-After` header. Checked before anything else so over-budget
/// clients cost one counter bump and nothing more.
#[tracing::instrument(skip(state, headers, params))]
pub async fn checkout_redirect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<CheckoutParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let client_ip = extract_client_ip(&headers);
    state
        .check_rate_limit(&ratelimit::CHECKOUT_GET, &client_ip)
        .await?;

    let Query(params) = params.map_err(|_| AppError::InvalidBody)?;
    let request = validate_get_request(
        &state.catalog,
        &state.public_url,
        params.price.as_deref(),
        params.source.as_deref(),
    )?;

    let session = create_session(&state, request).await?;
    Ok(Redirect::temporary(&session.url).into_response())
}

/// `POST /checkout` - subscribe with identity.
///
/// ## Request body
/// ```json
/// {
///   "priceId": "price_1SkylarkPlus",
///   "email": "customer@example.com",
///   "successUrl": "optional, same-origin",
///   "cancelUrl": "optional, same-origin",
///   "source": "optional attribution tag"
/// }
/// ```
/// Foreign-origin redirect URLs are rejected outright, never rewritten.
///
/// ## Rate limiting
/// 5 requests per hour per client IP. Checked before the body is parsed,
/// so malformed floods cost the same as valid ones.
///
/// ## Response
/// `200 OK` with `{ "sessionId": "cs_...", "url": "https://..." }`.
#[tracing::instrument(skip(state, headers, body))]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CheckoutPayload>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let client_ip = extract_client_ip(&headers);
    state
        .check_rate_limit(&ratelimit::SUBSCRIBE, &client_ip)
        .await?;

    let Json(payload) = body.map_err(|_| AppError::InvalidBody)?;
    let request = validate_post_request(&state.catalog, &state.public_url, &payload)?;

    let session = create_session(&state, request).await?;
    Ok(Json(SubscribeResponse {
        session_id: session.id,
        url: session.url,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Orchestration shared by both entry points: require a configured
/// provider, then open the session with the fixed trial attached.
async fn create_session(
    state: &AppState,
    request: CheckoutRequest,
) -> Result<CheckoutSession, AppError> {
    let payments = state.payments.as_ref().ok_or(AppError::NotConfigured)?;

    let tier = state
        .catalog
        .get_by_price_id(&request.price_id)
        .map(|t| t.id.clone())
        .unwrap_or_default();
    tracing::info!(%tier, price_id = %request.price_id, "creating checkout session");

    let session = payments
        .create_checkout_session(CreateSessionParams {
            price_id: request.price_id,
            customer_email: request.customer_email,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
            trial_period_days: Some(TRIAL_PERIOD_DAYS),
            source: request.source,
        })
        .await?;
    Ok(session)
}

/// Extract the real client IP from `X-Forwarded-For` (first entry).
///
/// Falls back to `"unknown"` when the header is absent, which pools
/// un-proxied traffic into one shared budget.
fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
