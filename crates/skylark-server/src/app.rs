use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use skylark_core::config::Config;

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer` - structured request/response logging via `tracing`.
/// 2. `CorsLayer` - the pricing page may live on a marketing origin;
///    `SKYLARK_CORS_ORIGINS` narrows the allow-list, empty means any.
///
/// `/checkout` and `/api/checkout` share handlers: the former is what
/// pricing-page links and emails point at, the latter matches the rest
/// of the JSON API namespace.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/checkout",
            get(routes::checkout::checkout_redirect).post(routes::checkout::subscribe),
        )
        .route(
            "/api/checkout",
            get(routes::checkout::checkout_redirect).post(routes::checkout::subscribe),
        )
        .route("/api/tiers", get(routes::tiers::list_tiers))
        .route("/api/upgrade-check", get(routes::upgrade::upgrade_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
