//! Stripe-backed [`PaymentSessions`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{CheckoutSession, CreateSessionParams, PaymentError, PaymentSessions};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin client over Stripe's hosted Checkout API. One instance is shared
/// for the process lifetime; `reqwest::Client` pools connections
/// internally.
pub struct StripeCheckout {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeCheckout {
    pub fn new(secret_key: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            secret_key,
            api_base: STRIPE_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API host. Used against stripe-mock
    /// in local testing.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    /// Absent on sessions that cannot be redirected to.
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl PaymentSessions for StripeCheckout {
    async fn create_checkout_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = session_form(&params);
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "no error detail".to_string());
            warn!(status = status.as_u16(), %message, "checkout session rejected");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|_| PaymentError::MalformedResponse)?;
        let url = session.url.ok_or(PaymentError::MalformedResponse)?;
        debug!(session_id = %session.id, "checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

/// Form-encoded body for `POST /v1/checkout/sessions`. Split out so the
/// exact wire shape is testable without network access.
fn session_form(params: &CreateSessionParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "subscription".to_string()),
        ("line_items[0][price]".to_string(), params.price_id.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
        ("allow_promotion_codes".to_string(), "true".to_string()),
    ];
    if let Some(email) = &params.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    if let Some(days) = params.trial_period_days {
        form.push((
            "subscription_data[trial_period_days]".to_string(),
            days.to_string(),
        ));
    }
    if let Some(source) = &params.source {
        form.push(("metadata[source]".to_string(), source.clone()));
    }
    form
}
