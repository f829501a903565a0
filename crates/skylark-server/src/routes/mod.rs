pub mod checkout;
pub mod health;
pub mod tiers;
pub mod upgrade;
