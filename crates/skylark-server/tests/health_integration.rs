use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use async_trait::async_trait;
use skylark_billing::{CheckoutSession, CreateSessionParams, PaymentError, PaymentSessions};
use skylark_core::config::{Config, PriceIds};
use skylark_server::app::build_app;
use skylark_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        public_url: "http://localhost:3000".to_string(),
        cors_origins: vec![],
        stripe_secret_key: None,
        price_ids: PriceIds::default(),
        rate_limit_disable: false,
    }
}

struct StubPaymentSessions;

#[async_trait]
impl PaymentSessions for StubPaymentSessions {
    async fn create_checkout_session(
        &self,
        _params: CreateSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        Ok(CheckoutSession {
            id: "cs_test_123".to_string(),
            url: "https://checkout.stripe.com/c/pay/cs_test_123".to_string(),
        })
    }
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn health_request() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request")
}

// ============================================================
// BDD: Health check reports version and an unconfigured checkout
// ============================================================
#[tokio::test]
async fn test_health_returns_200_without_a_provider() {
    let state = Arc::new(AppState::new(test_config()).expect("state builds"));
    let app = build_app(state);

    let response = app.oneshot(health_request()).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["checkout"], "unconfigured");
}

// ============================================================
// BDD: Health check reports checkout ready once a provider is set
// ============================================================
#[tokio::test]
async fn test_health_reports_checkout_ready() {
    let mut state = AppState::new(test_config()).expect("state builds");
    state.payments = Some(Arc::new(StubPaymentSessions));
    let app = build_app(Arc::new(state));

    let response = app.oneshot(health_request()).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checkout"], "ready");
}
