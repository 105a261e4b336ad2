//! Web tier configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GARGE_API_URL` - Base URL of the remote Garge REST API (e.g. `https://api.garge.app/api`)
//! - `GARGE_WEB_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `GARGE_WEB_HOST` - Bind address (default: 0.0.0.0)
//! - `GARGE_WEB_PORT` - Listen port (default: 3000)
//! - `GARGE_WEB_BASE_URL` - Public URL of this service (default: <http://localhost:3000>)
//! - `GARGE_WEB_LOG_FORMAT` - `text` or `json` (default: text)
//! - `GARGE_API_TIMEOUT_SECS` - Remote API request timeout (default: 10)
//! - `GARGE_ELECTRICITY_AREA` - Price area for the spot-price pages (default: NO2)
//! - `GARGE_ELECTRICITY_CURRENCY` - Spot-price currency (default: NOK)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: development)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry tracing sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
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

/// Garge web application configuration.
#[derive(Debug, Clone)]
pub struct GargeConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this service
    pub base_url: String,
    /// Session secret (validated for strength; sessions are server-side)
    pub session_secret: SecretString,
    /// Log output format
    pub log_format: LogFormat,
    /// Remote Garge API configuration
    pub api: GargeApiConfig,
    /// Electricity spot-price configuration
    pub electricity: ElectricityConfig,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Remote Garge API configuration.
#[derive(Debug, Clone)]
pub struct GargeApiConfig {
    /// Base URL without a trailing slash (e.g. `https://api.garge.app/api`)
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Electricity spot-price configuration.
///
/// The price area decides VAT treatment: Norwegian grid areas NO1-NO4 are
/// displayed with 25% VAT added.
#[derive(Debug, Clone)]
pub struct ElectricityConfig {
    /// Price area (e.g. NO2)
    pub area: String,
    /// Currency the API should quote prices in (e.g. NOK)
    pub currency: String,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// DSN; absent disables Sentry entirely
    pub dsn: Option<String>,
    /// Environment tag attached to events
    pub environment: String,
    /// Performance tracing sample rate (0.0 - 1.0)
    pub traces_sample_rate: f32,
}

/// Log output format selected via `GARGE_WEB_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

impl GargeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("GARGE_WEB_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GARGE_WEB_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("GARGE_WEB_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GARGE_WEB_PORT".to_string(), e.to_string()))?;
        let base_url = validate_url(
            "GARGE_WEB_BASE_URL",
            get_env_or_default("GARGE_WEB_BASE_URL", "http://localhost:3000"),
        )?;
        let session_secret = get_validated_secret("GARGE_WEB_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "GARGE_WEB_SESSION_SECRET")?;
        let log_format = get_env_or_default("GARGE_WEB_LOG_FORMAT", "text")
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidEnvVar("GARGE_WEB_LOG_FORMAT".to_string(), e))?;

        let api = GargeApiConfig::from_env()?;
        let electricity = ElectricityConfig::from_env();
        let sentry = SentryConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            log_format,
            api,
            electricity,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn cookies_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl GargeApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = validate_url("GARGE_API_URL", get_required_env("GARGE_API_URL")?)?;
        let timeout_secs = get_env_or_default("GARGE_API_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("GARGE_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }
}

impl ElectricityConfig {
    fn from_env() -> Self {
        Self {
            area: get_env_or_default("GARGE_ELECTRICITY_AREA", "NO2"),
            currency: get_env_or_default("GARGE_ELECTRICITY_CURRENCY", "NOK"),
        }
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let traces_sample_rate = get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")
            .parse::<f32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SENTRY_TRACES_SAMPLE_RATE".to_string(), e.to_string())
            })?;

        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_env_or_default("SENTRY_ENVIRONMENT", "development"),
            traces_sample_rate,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check that a value parses as an absolute URL, returning it unchanged.
fn validate_url(key: &str, value: String) -> Result<String, ConfigError> {
    Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        .map(|_| value)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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
