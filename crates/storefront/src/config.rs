//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BRICKHAUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BRICKHAUS_BASE_URL` - Public URL of the shop, used for payment return URLs
//! - `BRICKHAUS_ADMIN_TOKEN` - Bearer token for `/api/admin` (min 32 chars, high entropy)
//!
//! ## Optional
//! - `BRICKHAUS_HOST` - Bind address (default: 127.0.0.1)
//! - `BRICKHAUS_PORT` - Listen port (default: 3000)
//! - `BRICKHAUS_CURRENCY` - Shop currency (default: EUR)
//! - `BRICKHAUS_SHIPPING_FLAT` - Flat shipping rate (default: 4.95)
//! - `BRICKHAUS_FREE_SHIPPING_OVER` - Free shipping threshold, empty disables (default: 75.00)
//! - `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET`, `PAYPAL_MODE` (sandbox|live)
//! - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`
//! - `BANK_ACCOUNT_HOLDER`, `BANK_IBAN`, `BANK_BIC`
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE` (1.0), `SENTRY_TRACES_SAMPLE_RATE` (0.1)
//!
//! A payment provider or the mailer is disabled when its variables are all
//! absent. Setting only some of them is a configuration error.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use brickhaus_core::CurrencyCode;
use brickhaus_core::cart::ShippingPolicy;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::bricklink::OAuthCredentials;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the shop, without a trailing slash
    pub base_url: String,
    /// Bearer token for admin routes
    pub admin_token: SecretString,
    /// Currency every price and order is in
    pub currency: CurrencyCode,
    /// Flat-rate shipping rules
    pub shipping: ShippingPolicy,
    pub paypal: Option<PayPalConfig>,
    pub stripe: Option<StripeConfig>,
    pub bank_transfer: Option<BankTransferConfig>,
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// `PayPal` REST environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

impl PayPalMode {
    /// REST API base URL for this environment.
    #[must_use]
    pub const fn api_base(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://api-m.sandbox.paypal.com",
            Self::Live => "https://api-m.paypal.com",
        }
    }
}

impl core::str::FromStr for PayPalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" | "production" => Ok(Self::Live),
            other => Err(format!("expected sandbox or live, got {other}")),
        }
    }
}

/// `PayPal` REST credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub mode: PayPalMode,
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Stripe API credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    /// Webhook signing secret (`whsec_...`). Without it the webhook route is disabled.
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Bank account shown to customers who pay by transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTransferConfig {
    pub account_holder: String,
    pub iban: String,
    pub bic: Option<String>,
}

/// SMTP settings for order confirmation emails.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the admin token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BRICKHAUS_DATABASE_URL")?;
        let host = get_env_or_default("BRICKHAUS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BRICKHAUS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BRICKHAUS_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BRICKHAUS_PORT".to_string(), e.to_string()))?;
        let base_url = normalize_base_url(&get_required_env("BRICKHAUS_BASE_URL")?)?;

        let admin_token = get_validated_secret("BRICKHAUS_ADMIN_TOKEN")?;
        validate_token_length(&admin_token, "BRICKHAUS_ADMIN_TOKEN")?;

        let currency = get_env_or_default("BRICKHAUS_CURRENCY", "EUR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("BRICKHAUS_CURRENCY".to_string(), e))?;

        let shipping = ShippingPolicy {
            flat_rate: parse_decimal(
                "BRICKHAUS_SHIPPING_FLAT",
                &get_env_or_default("BRICKHAUS_SHIPPING_FLAT", "4.95"),
            )?,
            free_over: match get_env_or_default("BRICKHAUS_FREE_SHIPPING_OVER", "75.00").trim() {
                "" => None,
                raw => Some(parse_decimal("BRICKHAUS_FREE_SHIPPING_OVER", raw)?),
            },
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            admin_token,
            currency,
            shipping,
            paypal: PayPalConfig::from_env()?,
            stripe: StripeConfig::from_env()?,
            bank_transfer: BankTransferConfig::from_env()?,
            email: EmailConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_optional_env("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PayPalConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([client_id, client_secret]) =
            optional_group(["PAYPAL_CLIENT_ID", "PAYPAL_CLIENT_SECRET"], get_optional_env)?
        else {
            return Ok(None);
        };
        let mode = get_env_or_default("PAYPAL_MODE", "sandbox")
            .parse::<PayPalMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("PAYPAL_MODE".to_string(), e))?;

        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            mode,
        }))
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = get_optional_env("STRIPE_SECRET_KEY") else {
            if get_optional_env("STRIPE_WEBHOOK_SECRET").is_some() {
                return Err(ConfigError::MissingEnvVar("STRIPE_SECRET_KEY".to_string()));
            }
            return Ok(None);
        };
        if !secret_key.starts_with("sk_") && !secret_key.starts_with("rk_") {
            return Err(ConfigError::InvalidEnvVar(
                "STRIPE_SECRET_KEY".to_string(),
                "expected a key starting with sk_ or rk_".to_string(),
            ));
        }

        Ok(Some(Self {
            secret_key: SecretString::from(secret_key),
            webhook_secret: get_optional_env("STRIPE_WEBHOOK_SECRET").map(SecretString::from),
        }))
    }
}

impl BankTransferConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([account_holder, iban]) =
            optional_group(["BANK_ACCOUNT_HOLDER", "BANK_IBAN"], get_optional_env)?
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            account_holder,
            iban: normalize_iban(&iban),
            bic: get_optional_env("BANK_BIC"),
        }))
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some([smtp_host, smtp_username, smtp_password, from_address]) = optional_group(
            ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD", "EMAIL_FROM"],
            get_optional_env,
        )?
        else {
            return Ok(None);
        };
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password: SecretString::from(smtp_password),
            from_address,
        }))
    }
}

/// Load only the database URL, for tools that do not serve HTTP.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `BRICKHAUS_DATABASE_URL`
/// nor `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("BRICKHAUS_DATABASE_URL")
}

/// Load BrickLink Store API credentials (`BRICKLINK_CONSUMER_KEY`,
/// `BRICKLINK_CONSUMER_SECRET`, `BRICKLINK_TOKEN_VALUE`, `BRICKLINK_TOKEN_SECRET`).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming the first absent variable.
pub fn bricklink_credentials_from_env() -> Result<OAuthCredentials, ConfigError> {
    let _ = dotenvy::dotenv();
    bricklink_credentials(get_optional_env)
}

fn bricklink_credentials(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<OAuthCredentials, ConfigError> {
    const KEYS: [&str; 4] = [
        "BRICKLINK_CONSUMER_KEY",
        "BRICKLINK_CONSUMER_SECRET",
        "BRICKLINK_TOKEN_VALUE",
        "BRICKLINK_TOKEN_SECRET",
    ];
    let Some([consumer_key, consumer_secret, token_value, token_secret]) =
        optional_group(KEYS, lookup)?
    else {
        return Err(ConfigError::MissingEnvVar(KEYS[0].to_string()));
    };

    Ok(OAuthCredentials {
        consumer_key,
        consumer_secret: SecretString::from(consumer_secret),
        token_value,
        token_secret: SecretString::from(token_secret),
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
pub(crate) fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as absent.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a group of variables that enable one optional integration.
///
/// Returns `None` when every key is absent and the values when every key is
/// present. A partially configured group is an error naming the first
/// missing key.
fn optional_group<const N: usize>(
    keys: [&str; N],
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<[String; N]>, ConfigError> {
    let values = keys.map(|key| lookup(key));
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    let mut missing = keys.iter().zip(&values).filter(|(_, v)| v.is_none());
    if let Some((key, _)) = missing.next() {
        return Err(ConfigError::MissingEnvVar((*key).to_string()));
    }

    Ok(Some(values.map(Option::unwrap_or_default)))
}

fn parse_decimal(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let value: Decimal = raw
        .trim()
        .parse()
        .map_err(|e: rust_decimal::Error| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("BRICKHAUS_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "BRICKHAUS_BASE_URL".to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn normalize_iban(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Validate that a token meets minimum length requirements.
fn validate_token_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-admin-token-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_token_length() {
        assert!(validate_token_length(&SecretString::from("short"), "T").is_err());
        assert!(validate_token_length(&SecretString::from("a".repeat(32)), "T").is_ok());
    }

    #[test]
    fn test_optional_group_absent_is_none() {
        let result = optional_group(["A", "B"], lookup(&[])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_optional_group_complete() {
        let result = optional_group(["A", "B"], lookup(&[("A", "1"), ("B", "2")])).unwrap();
        assert_eq!(result, Some(["1".to_string(), "2".to_string()]));
    }

    #[test]
    fn test_optional_group_partial_is_error() {
        let result = optional_group(["A", "B"], lookup(&[("A", "1")]));
        match result {
            Err(ConfigError::MissingEnvVar(key)) => assert_eq!(key, "B"),
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("K", " 4.95 ").unwrap(), Decimal::new(495, 2));
        assert!(parse_decimal("K", "-1").is_err());
        assert!(parse_decimal("K", "abc").is_err());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://shop.example.org/").unwrap(),
            "https://shop.example.org"
        );
        assert!(normalize_base_url("ftp://shop.example.org").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_normalize_iban() {
        assert_eq!(
            normalize_iban("de89 3704 0044 0532 0130 00"),
            "DE89370400440532013000"
        );
    }

    #[test]
    fn test_paypal_mode() {
        assert_eq!("LIVE".parse::<PayPalMode>().unwrap(), PayPalMode::Live);
        assert_eq!(
            PayPalMode::default().api_base(),
            "https://api-m.sandbox.paypal.com"
        );
        assert!("prod-ish".parse::<PayPalMode>().is_err());
    }

    #[test]
    fn test_bricklink_credentials() {
        let creds = bricklink_credentials(lookup(&[
            ("BRICKLINK_CONSUMER_KEY", "ck"),
            ("BRICKLINK_CONSUMER_SECRET", "cs"),
            ("BRICKLINK_TOKEN_VALUE", "tv"),
            ("BRICKLINK_TOKEN_SECRET", "ts"),
        ]))
        .unwrap();
        assert_eq!(creds.consumer_key, "ck");
        assert_eq!(creds.token_secret.expose_secret(), "ts");

        match bricklink_credentials(lookup(&[])) {
            Err(ConfigError::MissingEnvVar(key)) => assert_eq!(key, "BRICKLINK_CONSUMER_KEY"),
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let paypal = PayPalConfig {
            client_id: "client".to_string(),
            client_secret: SecretString::from("hunter2hunter2"),
            mode: PayPalMode::Sandbox,
        };
        let debug = format!("{paypal:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}
