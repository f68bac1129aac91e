//! Configuration module for environment variable parsing.
//!
//! Everything is read once at process start. Secrets are opaque values that
//! come from the deployment environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use tracing::warn;

use crate::web::signature::SignatureEncoding;

/// Default lifetime of an OAuth state token in seconds.
pub const DEFAULT_OAUTH_STATE_TTL_SECS: u64 = 600;

/// Longest accepted OAuth state token lifetime (one day).
pub const MAX_OAUTH_STATE_TTL_SECS: u64 = 86_400;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    // =========================================================================
    // Webhook Verification
    // =========================================================================

    /// Shared secret used to sign webhooks
    pub webhook_secret: Option<String>,

    /// Encoding of the `X-Shopify-Hmac-Sha256` header
    pub signature_encoding: SignatureEncoding,

    // =========================================================================
    // OAuth Install Flow
    // =========================================================================

    /// OAuth client id
    pub api_key: Option<String>,

    /// OAuth client secret
    pub api_secret: Option<String>,

    /// Access scopes requested at install time
    pub scopes: Vec<String>,

    /// Admin API version used for webhook registration
    pub api_version: String,

    /// Public base URL of this service
    pub app_url: String,

    /// Frontend the browser lands on after a successful install
    pub frontend_url: String,

    /// Lifetime of an OAuth anti-forgery state token in seconds
    pub oauth_state_ttl_secs: u64,

    /// Timeout for outbound HTTP requests in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Carrier Detection
    // =========================================================================

    /// Optional JSON catalog replacing the built-in carrier catalog
    pub carrier_catalog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            webhook_secret: None,
            signature_encoding: SignatureEncoding::Base64,
            api_key: None,
            api_secret: None,
            scopes: vec!["read_orders".to_string(), "read_fulfillments".to_string()],
            api_version: "2024-01".to_string(),
            app_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            oauth_state_ttl_secs: DEFAULT_OAUTH_STATE_TTL_SECS,
            request_timeout_ms: 8000,
            carrier_catalog_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let api_secret = parse_secret("SHOPIFY_API_SECRET");

        Config {
            port: parse_or("PORT", defaults.port),

            // Shopify signs app webhooks with the client secret unless a
            // dedicated webhook secret is configured.
            webhook_secret: parse_secret("SHOPIFY_WEBHOOK_SECRET").or_else(|| api_secret.clone()),

            signature_encoding: parse_or(
                "SHOPIFY_WEBHOOK_SIGNATURE_ENCODING",
                defaults.signature_encoding,
            ),

            api_key: parse_secret("SHOPIFY_API_KEY"),

            api_secret,

            scopes: parse_csv("SHOPIFY_SCOPES").unwrap_or(defaults.scopes),

            api_version: env::var("SHOPIFY_API_VERSION").unwrap_or(defaults.api_version),

            app_url: env::var("APP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.app_url),

            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),

            oauth_state_ttl_secs: parse_state_ttl_secs(
                "OAUTH_STATE_TTL_SECS",
                defaults.oauth_state_ttl_secs,
            ),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),

            carrier_catalog_path: env::var("CARRIER_CATALOG_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Lifetime of an OAuth state token.
    ///
    /// Values outside `1..=MAX_OAUTH_STATE_TTL_SECS` fall back to the default.
    pub fn oauth_state_ttl(&self) -> Duration {
        state_ttl(self.oauth_state_ttl_secs).unwrap_or_else(|| {
            warn!(
                oauth_state_ttl_secs = self.oauth_state_ttl_secs,
                "Invalid OAuth state TTL, using default"
            );
            Duration::seconds(DEFAULT_OAUTH_STATE_TTL_SECS as i64)
        })
    }
}

fn state_ttl(secs: u64) -> Option<Duration> {
    if secs == 0 || secs > MAX_OAUTH_STATE_TTL_SECS {
        return None;
    }
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

/// Parse a state token lifetime, warning and falling back to `default` when
/// it is out of range.
fn parse_state_ttl_secs(name: &str, default: u64) -> u64 {
    let secs = parse_or(name, default);
    if state_ttl(secs).is_some() {
        secs
    } else {
        warn!(env_var = name, value = secs, "Out of range, using default");
        default
    }
}

/// Parse a value, warning and falling back to `default` when it is invalid.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read a secret; blank values count as unset.
fn parse_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
