//! Checkout request validation.
//!
//! Both admission paths (query-string and JSON body) funnel into a
//! [`CheckoutRequest`] that downstream code can trust: the price id is
//! whitelisted against the catalog, the email is normalized, and any
//! redirect override is pinned to the site origin. Checks run in a fixed
//! order so a request with several problems always reports the same one.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::tier::{is_valid_price_id_format, TierCatalog};

/// Upper bound on an inbound price id before any lookup happens.
pub const MAX_PRICE_ID_LEN: usize = 200;

/// Upper bound on a customer email, per RFC 5321 practice.
pub const MAX_EMAIL_LEN: usize = 254;

/// Attribution strings are clipped to this many characters.
pub const MAX_SOURCE_LEN: usize = 100;

/// Days of free trial granted on every new subscription.
pub const TRIAL_PERIOD_DAYS: u32 = 14;

/// JSON body accepted by the subscribe endpoint. Every field is optional
/// at the wire level; presence rules are enforced by validation so the
/// caller gets a field-specific message instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub price_id: Option<String>,
    pub email: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub source: Option<String>,
}

/// A fully validated admission request, ready for session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub source: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Carries the human label of the missing field ("Price ID", "Email").
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid price ID")]
    InvalidPrice,
}

impl ValidationError {
    /// Stable machine code for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidPrice => "invalid_price",
        }
    }
}

/// Validate the query-string path: anonymous, price id plus an optional
/// attribution tag, redirect URLs always from the site defaults.
pub fn validate_get_request(
    catalog: &TierCatalog,
    public_url: &Url,
    price_id: Option<&str>,
    source: Option<&str>,
) -> Result<CheckoutRequest, ValidationError> {
    let price_id = require_price_id(price_id)?;
    check_price(catalog, price_id)?;
    Ok(CheckoutRequest {
        price_id: price_id.to_string(),
        customer_email: None,
        success_url: default_success_url(public_url),
        cancel_url: default_cancel_url(public_url),
        source: source.and_then(sanitize_source),
    })
}

/// Validate the JSON path. Order: price id presence, price id format,
/// catalog membership, email, then redirect overrides.
pub fn validate_post_request(
    catalog: &TierCatalog,
    public_url: &Url,
    payload: &CheckoutPayload,
) -> Result<CheckoutRequest, ValidationError> {
    let price_id = require_price_id(payload.price_id.as_deref())?;
    check_price(catalog, price_id)?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(ValidationError::MissingField("Email"))?;
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }

    let success_url = resolve_override(
        "successUrl",
        payload.success_url.as_deref(),
        public_url,
        default_success_url(public_url),
    )?;
    let cancel_url = resolve_override(
        "cancelUrl",
        payload.cancel_url.as_deref(),
        public_url,
        default_cancel_url(public_url),
    )?;

    Ok(CheckoutRequest {
        price_id: price_id.to_string(),
        customer_email: Some(email.to_lowercase()),
        success_url,
        cancel_url,
        source: payload.source.as_deref().and_then(sanitize_source),
    })
}

/// Post-payment landing page. The `{CHECKOUT_SESSION_ID}` placeholder is
/// substituted by the payment provider, not by us.
pub fn default_success_url(public_url: &Url) -> String {
    format!(
        "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
        site_base(public_url)
    )
}

pub fn default_cancel_url(public_url: &Url) -> String {
    format!("{}/pricing", site_base(public_url))
}

/// Minimal syntactic email check: one `@`, non-empty sides, a dot in the
/// domain, no whitespace. Deliverability is the provider's problem.
pub fn is_valid_email(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > MAX_EMAIL_LEN {
        return false;
    }
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn require_price_id(raw: Option<&str>) -> Result<&str, ValidationError> {
    raw.filter(|p| !p.is_empty())
        .ok_or(ValidationError::MissingField("Price ID"))
}

fn check_price(catalog: &TierCatalog, price_id: &str) -> Result<(), ValidationError> {
    if price_id.len() > MAX_PRICE_ID_LEN || !is_valid_price_id_format(price_id) {
        return Err(ValidationError::InvalidFormat(
            "Invalid price ID format".to_string(),
        ));
    }
    if catalog.get_by_price_id(price_id).is_none() {
        return Err(ValidationError::InvalidPrice);
    }
    Ok(())
}

/// Accept an override only when it parses as an absolute http(s) URL on
/// the same origin as the site. The raw string is passed through
/// untouched so placeholder braces survive.
fn resolve_override(
    field: &'static str,
    provided: Option<&str>,
    public_url: &Url,
    default: String,
) -> Result<String, ValidationError> {
    let Some(raw) = provided.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    let parsed = Url::parse(raw).map_err(|_| {
        ValidationError::InvalidFormat(format!("{field} must be a valid absolute URL"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidFormat(format!(
            "{field} must use http or https"
        )));
    }
    if parsed.origin() != public_url.origin() {
        return Err(ValidationError::InvalidFormat(format!(
            "{field} must stay on this site"
        )));
    }
    Ok(raw.to_string())
}

fn site_base(public_url: &Url) -> &str {
    public_url.as_str().trim_end_matches('/')
}

fn sanitize_source(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_SOURCE_LEN)
        .collect();
    let trimmed = cleaned.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PriceIds;

    fn catalog() -> TierCatalog {
        TierCatalog::from_price_ids(&PriceIds::default()).expect("default catalog is valid")
    }

    fn site() -> Url {
        Url::parse("http://localhost:3000").expect("base url parses")
    }

    fn payload(price_id: &str, email: &str) -> CheckoutPayload {
        CheckoutPayload {
            price_id: Some(price_id.to_string()),
            email: Some(email.to_string()),
            ..CheckoutPayload::default()
        }
    }

    #[test]
    fn absent_or_empty_price_id_is_missing() {
        let catalog = catalog();
        let missing = validate_get_request(&catalog, &site(), None, None);
        assert_eq!(missing, Err(ValidationError::MissingField("Price ID")));
        assert_eq!(
            missing.unwrap_err().to_string(),
            "Price ID is required"
        );
        assert_eq!(
            validate_get_request(&catalog, &site(), Some(""), None),
            Err(ValidationError::MissingField("Price ID"))
        );
    }

    #[test]
    fn malformed_price_ids_fail_before_lookup() {
        let catalog = catalog();
        for bad in ["plan_basic", "price_", "price_abc-def", "PRICE_1X"] {
            assert!(matches!(
                validate_get_request(&catalog, &site(), Some(bad), None),
                Err(ValidationError::InvalidFormat(_))
            ));
        }
        let oversized = format!("price_{}", "a".repeat(195));
        assert!(matches!(
            validate_get_request(&catalog, &site(), Some(&oversized), None),
            Err(ValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn length_boundary_admits_exactly_max() {
        let catalog = catalog();
        // 200 chars total, pattern-valid, just not in the catalog.
        let boundary = format!("price_{}", "a".repeat(194));
        assert_eq!(boundary.len(), MAX_PRICE_ID_LEN);
        assert_eq!(
            validate_get_request(&catalog, &site(), Some(&boundary), None),
            Err(ValidationError::InvalidPrice)
        );
    }

    #[test]
    fn well_formed_unknown_price_is_rejected_by_the_whitelist() {
        let catalog = catalog();
        let rejected = validate_get_request(&catalog, &site(), Some("price_1NotOurs"), None);
        assert_eq!(rejected, Err(ValidationError::InvalidPrice));
        assert_eq!(rejected.unwrap_err().to_string(), "Invalid price ID");
    }

    #[test]
    fn get_request_uses_site_defaults() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let request = validate_get_request(&catalog, &site(), Some(&ids.plus), None)
            .expect("catalog price is accepted");
        assert_eq!(request.price_id, ids.plus);
        assert!(request.customer_email.is_none());
        assert!(request.source.is_none());
        assert_eq!(
            request.success_url,
            "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "http://localhost:3000/pricing");
    }

    #[test]
    fn get_request_carries_a_sanitized_source() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let request =
            validate_get_request(&catalog, &site(), Some(&ids.plus), Some("email\ncampaign"))
                .expect("catalog price is accepted");
        assert_eq!(request.source.as_deref(), Some("emailcampaign"));
    }

    #[test]
    fn post_requires_an_email() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let mut body = payload(&ids.personal, "");
        assert_eq!(
            validate_post_request(&catalog, &site(), &body),
            Err(ValidationError::MissingField("Email"))
        );
        body.email = Some("   ".to_string());
        assert_eq!(
            validate_post_request(&catalog, &site(), &body),
            Err(ValidationError::MissingField("Email"))
        );
        body.email = None;
        assert_eq!(
            validate_post_request(&catalog, &site(), &body),
            Err(ValidationError::MissingField("Email"))
        );
    }

    #[test]
    fn syntactically_broken_emails_are_rejected() {
        let catalog = catalog();
        let ids = PriceIds::default();
        for bad in ["nodomain", "a@b", "a@b.", "@x.com", "a@", "white space@x.com", "a@@x.com"] {
            let body = payload(&ids.personal, bad);
            assert_eq!(
                validate_post_request(&catalog, &site(), &body),
                Err(ValidationError::InvalidEmail),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let body = payload(&ids.personal, "  User@Example.COM  ");
        let request =
            validate_post_request(&catalog, &site(), &body).expect("valid request");
        assert_eq!(request.customer_email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn same_origin_overrides_pass_through_verbatim() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let mut body = payload(&ids.plus, "a@b.com");
        body.success_url =
            Some("http://localhost:3000/thanks?sid={CHECKOUT_SESSION_ID}".to_string());
        body.cancel_url = Some("http://localhost:3000/plans".to_string());
        let request = validate_post_request(&catalog, &site(), &body).expect("valid request");
        assert_eq!(
            request.success_url,
            "http://localhost:3000/thanks?sid={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "http://localhost:3000/plans");
    }

    #[test]
    fn foreign_origin_overrides_are_rejected() {
        let catalog = catalog();
        let ids = PriceIds::default();
        for bad in [
            "https://evil.example/phish",
            "http://localhost:9999/thanks",
            "https://localhost:3000/thanks",
            "javascript:alert(1)",
            "/thanks",
        ] {
            let mut body = payload(&ids.plus, "a@b.com");
            body.success_url = Some(bad.to_string());
            assert!(
                matches!(
                    validate_post_request(&catalog, &site(), &body),
                    Err(ValidationError::InvalidFormat(_))
                ),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn blank_overrides_fall_back_to_defaults() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let mut body = payload(&ids.plus, "a@b.com");
        body.success_url = Some("".to_string());
        body.cancel_url = Some("   ".to_string());
        let request = validate_post_request(&catalog, &site(), &body).expect("valid request");
        assert_eq!(
            request.success_url,
            "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "http://localhost:3000/pricing");
    }

    #[test]
    fn source_is_sanitized_and_clipped() {
        let catalog = catalog();
        let ids = PriceIds::default();
        let mut body = payload(&ids.plus, "a@b.com");
        body.source = Some("pricing\npage\u{7}".to_string());
        let request = validate_post_request(&catalog, &site(), &body).expect("valid request");
        assert_eq!(request.source.as_deref(), Some("pricingpage"));

        let mut body = payload(&ids.plus, "a@b.com");
        body.source = Some("x".repeat(300));
        let request = validate_post_request(&catalog, &site(), &body).expect("valid request");
        assert_eq!(request.source.map(|s| s.len()), Some(MAX_SOURCE_LEN));

        let mut body = payload(&ids.plus, "a@b.com");
        body.source = Some("\u{0}\u{1}".to_string());
        let request = validate_post_request(&catalog, &site(), &body).expect("valid request");
        assert!(request.source.is_none());
    }

    #[test]
    fn payload_accepts_camel_case_and_ignores_extras() {
        let body: CheckoutPayload = serde_json::from_str(
            r#"{"priceId": "price_1X", "email": "a@b.com", "successUrl": null, "utm": "ignored"}"#,
        )
        .expect("payload deserializes");
        assert_eq!(body.price_id.as_deref(), Some("price_1X"));
        assert_eq!(body.email.as_deref(), Some("a@b.com"));
        assert!(body.success_url.is_none());
    }

    #[test]
    fn validation_codes_are_stable() {
        assert_eq!(ValidationError::MissingField("Email").code(), "missing_field");
        assert_eq!(
            ValidationError::InvalidFormat(String::new()).code(),
            "invalid_format"
        );
        assert_eq!(ValidationError::InvalidEmail.code(), "invalid_email");
        assert_eq!(ValidationError::InvalidPrice.code(), "invalid_price");
    }
}
