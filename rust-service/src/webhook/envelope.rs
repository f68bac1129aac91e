//! Inbound webhook envelope.

use axum::body::Bytes;
use axum::http::HeaderMap;

use crate::web::signature::{self, SignatureEncoding};

pub const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
pub const TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
pub const WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";

/// A webhook request as received, before its body is interpreted.
///
/// `raw_body` holds the exact bytes off the wire; the signature is computed
/// over them, so nothing may parse or re-encode the body before [`verify`]
/// has passed.
///
/// [`verify`]: WebhookEnvelope::verify
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    pub raw_body: Bytes,
    pub signature_header: Option<String>,
    /// Empty when neither the route nor the headers name a topic
    pub topic: String,
    pub shop: String,
    pub webhook_id: Option<String>,
}

impl WebhookEnvelope {
    /// Build an envelope from request headers and the raw body.
    ///
    /// A topic taken from the route path wins over the `X-Shopify-Topic`
    /// header.
    pub fn from_request(headers: &HeaderMap, raw_body: Bytes, path_topic: Option<String>) -> Self {
        Self {
            raw_body,
            signature_header: header(headers, HMAC_HEADER),
            topic: path_topic
                .or_else(|| header(headers, TOPIC_HEADER))
                .unwrap_or_default(),
            shop: header(headers, SHOP_DOMAIN_HEADER).unwrap_or_default(),
            webhook_id: header(headers, WEBHOOK_ID_HEADER),
        }
    }

    /// Check the body against the signature header.
    pub fn verify(&self, shared_secret: &str, encoding: SignatureEncoding) -> bool {
        signature::verify(
            &self.raw_body,
            self.signature_header.as_deref(),
            shared_secret,
            encoding,
        )
    }

    /// The topic named in the headers, whatever the route said.
    pub fn header_topic(headers: &HeaderMap) -> Option<String> {
        header(headers, TOPIC_HEADER)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
