use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;
use url::Url;

use skylark_billing::{stripe::StripeCheckout, PaymentSessions};
use skylark_core::{
    config::Config,
    ratelimit::{MemoryRateLimitStore, RateDecision, RateLimitStore, RatePolicy},
    tier::TierCatalog,
};

use crate::error::AppError;

/// How often expired rate-limit windows are swept.
const WINDOW_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// The validated tier table. Read-only and shared across all requests.
    pub catalog: Arc<TierCatalog>,

    /// Parsed `config.public_url`: the origin redirect overrides must match.
    pub public_url: Url,

    /// Session creator for the payment provider. `None` when no secret
    /// key is configured, in which case checkout endpoints answer 503.
    /// Tests substitute their own implementation.
    pub payments: Option<Arc<dyn PaymentSessions>>,

    /// Counter store behind the per-endpoint rate policies.
    pub rate_limits: Arc<dyn RateLimitStore>,
}

impl AppState {
    /// Construct state from config: validate the catalog, parse the
    /// public URL, and build the provider client when a secret key is
    /// present.
    pub fn new(config: Config) -> Result<Self> {
        let catalog = TierCatalog::from_price_ids(&config.price_ids)
            .context("tier catalog failed validation")?;
        let public_url =
            Url::parse(&config.public_url).context("SKYLARK_PUBLIC_URL is not a valid URL")?;

        let payments: Option<Arc<dyn PaymentSessions>> = match &config.stripe_secret_key {
            Some(key) => {
                let client = StripeCheckout::new(key.clone())
                    .context("failed to build payment provider client")?;
                Some(Arc::new(client))
            }
            None => {
                warn!("STRIPE_SECRET_KEY not set; checkout endpoints will answer 503");
                None
            }
        };

        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            public_url,
            payments,
            rate_limits: Arc::new(MemoryRateLimitStore::new()),
        })
    }

    /// Gate one request against `policy`, keyed by client IP.
    ///
    /// The hit is recorded even when the outcome is a rejection.
    /// `SKYLARK_RATE_LIMIT_DISABLE=true` short-circuits to allowed
    /// without touching the counters.
    pub async fn check_rate_limit(
        &self,
        policy: &RatePolicy,
        client: &str,
    ) -> Result<(), AppError> {
        if self.config.rate_limit_disable {
            return Ok(());
        }
        match policy.check(self.rate_limits.as_ref(), client).await {
            RateDecision::Allowed => Ok(()),
            RateDecision::Limited {
                retry_after_seconds,
            } => {
                warn!(
                    policy = policy.name,
                    client, retry_after_seconds, "rate limit exceeded"
                );
                Err(AppError::RateLimited {
                    retry_after_seconds,
                })
            }
        }
    }

    /// Background loop: periodically drop expired rate-limit windows.
    ///
    /// Spawned as a `tokio::spawn` task in `main.rs`. Runs until the
    /// process exits.
    pub async fn run_window_sweep_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(WINDOW_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            self.rate_limits.sweep().await;
        }
    }
}
