//! Authorization redirect, callback verification and code exchange.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::registration::{register_webhooks, RegistrationOutcome};
use super::state::StateStore;
use super::{is_valid_shop_domain, OAuthError};
use crate::web::signature::{self, SignatureEncoding};
use crate::Config;

/// Token returned by the access token endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// Client for the platform's OAuth endpoints.
#[derive(Clone)]
pub struct ShopifyOAuth {
    http: Client,
    api_key: Option<String>,
    api_secret: Option<String>,
    scopes: Vec<String>,
    api_version: String,
    app_url: String,
    frontend_url: String,
    /// Replaces `https://<shop>` as the admin host when set
    admin_base: Option<String>,
    states: StateStore,
}

impl ShopifyOAuth {
    pub fn new(config: &Config, http: Client) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            scopes: config.scopes.clone(),
            api_version: config.api_version.clone(),
            app_url: config.app_url.clone(),
            frontend_url: config.frontend_url.clone(),
            admin_base: None,
            states: StateStore::new(config.oauth_state_ttl()),
        }
    }

    /// Send admin API calls to `base` instead of the shop's own host.
    pub fn with_admin_base(mut self, base: impl Into<String>) -> Self {
        self.admin_base = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    pub fn states(&self) -> &StateStore {
        &self.states
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app_url)
    }

    fn admin_base(&self, shop: &str) -> String {
        self.admin_base
            .clone()
            .unwrap_or_else(|| format!("https://{}", shop))
    }

    fn api_key(&self) -> Result<&str, OAuthError> {
        self.api_key
            .as_deref()
            .ok_or(OAuthError::NotConfigured("SHOPIFY_API_KEY"))
    }

    fn api_secret(&self) -> Result<&str, OAuthError> {
        self.api_secret
            .as_deref()
            .ok_or(OAuthError::NotConfigured("SHOPIFY_API_SECRET"))
    }

    /// Start an install: issue a state token and build the authorize URL.
    pub async fn begin_install(&self, shop: &str) -> Result<Url, OAuthError> {
        if !is_valid_shop_domain(shop) {
            return Err(OAuthError::InvalidShop(shop.to_string()));
        }
        self.api_key()?;

        let state = self.states.issue(shop).await;
        let url = self.authorize_url(shop, &state)?;

        info!(shop = %shop, "oauth_install_started");
        Ok(url)
    }

    /// `https://<shop>/admin/oauth/authorize?client_id&scope&redirect_uri&state`
    pub fn authorize_url(&self, shop: &str, state: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&format!("{}/admin/oauth/authorize", self.admin_base(shop)))?;
        url.query_pairs_mut()
            .append_pair("client_id", self.api_key()?)
            .append_pair("scope", &self.scopes.join(","))
            .append_pair("redirect_uri", &self.redirect_uri())
            .append_pair("state", state);
        Ok(url)
    }

    /// Check the `hmac` parameter of a callback query.
    ///
    /// The signed message is every other parameter, sorted by key and joined
    /// as `key=value&...`; the digest is hex HMAC-SHA256 keyed with the
    /// client secret.
    pub fn verify_callback_hmac(&self, params: &[(String, String)]) -> Result<(), OAuthError> {
        let secret = self.api_secret()?;
        let provided = query_value(params, "hmac").ok_or(OAuthError::MissingParameter("hmac"))?;

        let message = callback_message(params);
        if signature::verify(message.as_bytes(), Some(provided), secret, SignatureEncoding::Hex) {
            Ok(())
        } else {
            Err(OAuthError::InvalidHmac)
        }
    }

    /// Run the callback checks and exchange the code.
    ///
    /// Order: shop domain, code present, query HMAC, then the state token.
    /// The HMAC is checked before the state so a forged callback cannot burn
    /// a legitimate install's token.
    pub async fn complete_install(
        &self,
        params: &[(String, String)],
    ) -> Result<(String, AccessToken), OAuthError> {
        let shop = query_value(params, "shop").ok_or(OAuthError::MissingParameter("shop"))?;
        if !is_valid_shop_domain(shop) {
            return Err(OAuthError::InvalidShop(shop.to_string()));
        }
        let code = query_value(params, "code").ok_or(OAuthError::MissingParameter("code"))?;
        let state = query_value(params, "state").ok_or(OAuthError::MissingParameter("state"))?;

        self.verify_callback_hmac(params)?;

        if !self.states.consume(state, shop).await {
            return Err(OAuthError::InvalidState);
        }

        let token = self.exchange_code(shop, code).await?;
        info!(shop = %shop, scope = %token.scope, "oauth_install_completed");

        Ok((shop.to_string(), token))
    }

    /// Exchange an authorization code for an offline access token.
    pub async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessToken, OAuthError> {
        let url = format!("{}/admin/oauth/access_token", self.admin_base(shop));
        let request = TokenRequest {
            client_id: self.api_key()?,
            client_secret: self.api_secret()?,
            code,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(shop = %shop, status = status.as_u16(), "oauth_token_exchange_rejected");
            return Err(OAuthError::TokenExchange(format!("status {}", status)));
        }

        response
            .json::<AccessToken>()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))
    }

    /// Where the browser goes after a successful install.
    pub fn frontend_redirect(&self, shop: &str, token: &AccessToken) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.frontend_url)?;
        url.query_pairs_mut()
            .append_pair("shop", shop)
            .append_pair("token", &token.access_token);
        Ok(url)
    }

    /// Subscribe `shop` to this service's webhooks.
    pub async fn register_webhooks(&self, shop: &str, token: &AccessToken) -> Vec<RegistrationOutcome> {
        register_webhooks(
            &self.http,
            &self.admin_base(shop),
            &token.access_token,
            &self.api_version,
            &self.app_url,
        )
        .await
    }
}

fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn callback_message(params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params.iter().filter(|(k, _)| k != "hmac").collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
