//! Payment-provider integration.
//!
//! The server talks to [`PaymentSessions`] only; the Stripe-backed
//! implementation lives in [`stripe`]. Tests substitute their own
//! implementation to capture what would have been sent.

pub mod stripe;

use async_trait::async_trait;
use thiserror::Error;

/// Everything needed to open a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionParams {
    pub price_id: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_period_days: Option<u32>,
    /// Attribution tag forwarded as session metadata.
    pub source: Option<String>,
}

/// A hosted checkout session the customer can be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider could not be reached or timed out.
    #[error("payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered with an error status.
    #[error("payment provider rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    /// The provider answered 2xx but the body was not usable.
    #[error("payment provider returned a malformed response")]
    MalformedResponse,
}

/// Creates hosted checkout sessions with the payment provider.
#[async_trait]
pub trait PaymentSessions: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<CheckoutSession, PaymentError>;
}
