//! Shopify OAuth install flow.
//!
//! ```text
//! /auth?shop → authorize redirect → /auth/callback → token exchange
//!            → webhook registration (background) → frontend redirect
//! ```
//!
//! This is plumbing around the platform's authorization server. Webhook
//! verification does not depend on it; it only needs the shared secret.

pub mod client;
pub mod registration;
pub mod state;

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub use client::{AccessToken, ShopifyOAuth};
pub use registration::{register_webhooks, registered_topics, RegistrationOutcome};
pub use state::StateStore;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid shop domain: {0}")]
    InvalidShop(String),

    #[error("missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("callback HMAC verification failed")]
    InvalidHmac,

    #[error("unknown, expired or mismatched state token")]
    InvalidState,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("access token exchange failed: {0}")]
    TokenExchange(String),

    #[error("webhook registration for {topic} failed: {reason}")]
    Registration { topic: String, reason: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Whether `shop` is a bare `*.myshopify.com` host name.
///
/// Redirects and server-to-server calls are built from this value, so
/// anything else (schemes, paths, other hosts) is refused.
pub fn is_valid_shop_domain(shop: &str) -> bool {
    static SHOP_RE: OnceLock<Regex> = OnceLock::new();
    SHOP_RE
        .get_or_init(|| {
            Regex::new(r"^[a-z0-9][a-z0-9\-]*\.myshopify\.com$").expect("valid shop regex")
        })
        .is_match(shop)
}
