//! Per-endpoint admission budgets.
//!
//! Keys are `{policy name}:{client ip}`, so each endpoint meters each
//! client separately.

use std::time::Duration;

use skylark_core::ratelimit::RatePolicy;

/// `GET /checkout` - browser-driven redirect flow.
pub const CHECKOUT_GET: RatePolicy = RatePolicy::new("checkout", 10, Duration::from_secs(60));

/// `POST /checkout` - subscribe calls from the pricing page.
pub const SUBSCRIBE: RatePolicy = RatePolicy::new("subscribe", 5, Duration::from_secs(3600));
