//! Domain core for the Skylark subscription service: tier catalog,
//! upgrade policy, checkout validation, and rate limiting. No HTTP and no
//! payment-provider specifics live here.

pub mod checkout;
pub mod config;
pub mod ratelimit;
pub mod tier;
pub mod upgrade;
