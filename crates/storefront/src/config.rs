//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_GATEWAY_URL` - Base URL of the hosted backend project
//! - `SHOPFRONT_GATEWAY_ANON_KEY` - Project anon key (public, but must be real)
//!
//! ## Optional
//! - `SHOPFRONT_PRODUCT_IMAGE_BUCKET` - Storage bucket for product images (default: product-images)
//! - `SHOPFRONT_ADMIN_PASSWORD` - Password for the admin panel gate (admin disabled when unset)
//! - `SHOPFRONT_ADMIN_FLAG_PATH` - File recording admin access (default: .shopfront/admin_access)
//! - `SHOPFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SHOPFRONT_ORDER_PLACEMENT` - `sequential` or `atomic` (default: sequential)
//! - `SHOPFRONT_DEFAULT_COUNTRY` - Country used when checkout leaves it blank (default: India)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::checkout::{DEFAULT_COUNTRY, OrderPlacement};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_IMAGE_BUCKET: &str = "product-images";
const DEFAULT_ADMIN_FLAG_PATH: &str = ".shopfront/admin_access";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Hosted backend connection
    pub gateway: GatewayConfig,
    /// Storage bucket for product images
    pub product_image_bucket: String,
    /// Admin panel gate
    pub admin: AdminConfig,
    /// How long catalog listings stay cached
    pub catalog_cache_ttl: Duration,
    /// How checkout writes orders
    pub order_placement: OrderPlacement,
    /// Country recorded when the shipping form leaves it blank
    pub default_country: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Hosted backend connection settings.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: Url,
    /// Anon key sent as `apikey` on every request
    pub anon_key: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Admin panel gate settings.
#[derive(Clone)]
pub struct AdminConfig {
    /// Password that unlocks the panel. `None` keeps it locked.
    pub password: Option<SecretString>,
    /// File holding the persisted access flag
    pub flag_path: PathBuf,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("flag_path", &self.flag_path)
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: None,
            flag_path: PathBuf::from(DEFAULT_ADMIN_FLAG_PATH),
        }
    }
}

impl StorefrontConfig {
    /// Configuration for `gateway` with every optional setting at its default.
    #[must_use]
    pub fn new(gateway: GatewayConfig) -> Self {
        Self {
            gateway,
            product_image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            admin: AdminConfig::default(),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            order_placement: OrderPlacement::default(),
            default_country: DEFAULT_COUNTRY.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the anon key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gateway = GatewayConfig::from_env()?;
        let admin = AdminConfig {
            password: get_optional_env("SHOPFRONT_ADMIN_PASSWORD").map(SecretString::from),
            flag_path: PathBuf::from(get_env_or_default(
                "SHOPFRONT_ADMIN_FLAG_PATH",
                DEFAULT_ADMIN_FLAG_PATH,
            )),
        };
        let cache_ttl_secs: u64 = parse_env_or_default(
            "SHOPFRONT_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?;
        let order_placement = parse_env_or_default(
            "SHOPFRONT_ORDER_PLACEMENT",
            OrderPlacement::default(),
        )?;

        Ok(Self {
            gateway,
            product_image_bucket: get_env_or_default(
                "SHOPFRONT_PRODUCT_IMAGE_BUCKET",
                DEFAULT_IMAGE_BUCKET,
            ),
            admin,
            catalog_cache_ttl: Duration::from_secs(cache_ttl_secs),
            order_placement,
            default_country: get_env_or_default("SHOPFRONT_DEFAULT_COUNTRY", DEFAULT_COUNTRY),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SHOPFRONT_GATEWAY_URL")?;
        let url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPFRONT_GATEWAY_URL".to_string(), e.to_string())
        })?;
        Ok(Self {
            url,
            anon_key: get_validated_secret("SHOPFRONT_GATEWAY_ANON_KEY")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Unset and blank both count as absent.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut freq: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let len = f64::from(total);
    freq.values()
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and low-entropy keys.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
