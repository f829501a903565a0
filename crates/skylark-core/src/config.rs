use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Canonical deployment origin. Same-origin enforcement for checkout
    /// redirect URLs and the default success/cancel targets derive from it.
    pub public_url: String,
    pub cors_origins: Vec<String>,
    /// Stripe secret key. Absence disables checkout (503) without
    /// affecting the rest of the API.
    pub stripe_secret_key: Option<String>,
    pub price_ids: PriceIds,
    pub rate_limit_disable: bool,
}

/// External payment-plan identifiers for the paid tiers.
///
/// Defaults are pattern-valid placeholders so the catalog loads (and tests
/// run) without environment; real deployments set the `STRIPE_PRICE_*`
/// variables.
#[derive(Debug, Clone)]
pub struct PriceIds {
    pub personal: String,
    pub plus: String,
    pub family: String,
    pub pro: String,
    pub team: String,
}

impl Default for PriceIds {
    fn default() -> Self {
        Self {
            personal: "price_1SkylarkPersonal".to_string(),
            plus: "price_1SkylarkPlus".to_string(),
            family: "price_1SkylarkFamily".to_string(),
            pro: "price_1SkylarkPro".to_string(),
            team: "price_1SkylarkTeam".to_string(),
        }
    }
}

impl PriceIds {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            personal: std::env::var("STRIPE_PRICE_PERSONAL").unwrap_or(defaults.personal),
            plus: std::env::var("STRIPE_PRICE_PLUS").unwrap_or(defaults.plus),
            family: std::env::var("STRIPE_PRICE_FAMILY").unwrap_or(defaults.family),
            pro: std::env::var("STRIPE_PRICE_PRO").unwrap_or(defaults.pro),
            team: std::env::var("STRIPE_PRICE_TEAM").unwrap_or(defaults.team),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let public_url = std::env::var("SKYLARK_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        // Fail at startup rather than on the first checkout request.
        Url::parse(&public_url).map_err(|e| format!("invalid SKYLARK_PUBLIC_URL: {e}"))?;

        Ok(Self {
            port: std::env::var("SKYLARK_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            public_url,
            cors_origins: std::env::var("SKYLARK_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            price_ids: PriceIds::from_env(),
            rate_limit_disable: std::env::var("SKYLARK_RATE_LIMIT_DISABLE")
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }
}
