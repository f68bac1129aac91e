//! Topic dispatch for verified webhooks.
//!
//! ```text
//! WebhookEnvelope → dispatch() → TopicHandler → HandlerResult
//! ```
//!
//! The dispatcher never verifies signatures itself; callers must have
//! checked the envelope first.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::envelope::WebhookEnvelope;

/// Metadata passed to every handler alongside the parsed body.
#[derive(Debug, Clone, Copy)]
pub struct WebhookContext<'a> {
    pub topic: &'a str,
    pub shop: &'a str,
    pub webhook_id: Option<&'a str>,
}

/// What a handler returns when it accepts a webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledgement {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Acknowledgement {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Outcome of dispatching one webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    Acknowledged(Acknowledgement),
    /// No handler for the topic. Not an error: callers still acknowledge.
    NotFound,
    /// The body could not be interpreted for its topic
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("payload does not match topic: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Handles the webhooks of one topic.
///
/// Handlers return an acknowledgment value and leave persistence and other
/// slow work to external collaborators.
pub trait TopicHandler: Send + Sync {
    fn handle(&self, ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError>;
}

impl<F> TopicHandler for F
where
    F: Fn(&WebhookContext<'_>, Value) -> Result<Acknowledgement, HandlerError> + Send + Sync,
{
    fn handle(&self, ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError> {
        self(ctx, body)
    }
}

/// Maps topic strings to handlers by exact match.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn TopicHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`, replacing any previous handler.
    pub fn register<H>(&mut self, topic: impl Into<String>, handler: H) -> &mut Self
    where
        H: TopicHandler + 'static,
    {
        self.handlers.insert(topic.into(), Arc::new(handler));
        self
    }

    pub fn handles(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    /// Registered topics, sorted.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Route a verified envelope to its topic handler.
    ///
    /// Unknown topics return [`HandlerResult::NotFound`] without touching the
    /// body. A body that is not JSON, or does not fit the topic's payload,
    /// returns [`HandlerResult::Rejected`].
    pub fn dispatch(&self, envelope: &WebhookEnvelope) -> HandlerResult {
        let handler = match self.handlers.get(envelope.topic.as_str()) {
            Some(h) => h,
            None => {
                info!(topic = %envelope.topic, shop = %envelope.shop, "webhook_topic_unhandled");
                return HandlerResult::NotFound;
            }
        };

        let body: Value = match serde_json::from_slice(&envelope.raw_body) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    topic = %envelope.topic,
                    shop = %envelope.shop,
                    error = %e,
                    "webhook_body_not_json"
                );
                return HandlerResult::Rejected("malformed JSON payload".to_string());
            }
        };

        let ctx = WebhookContext {
            topic: &envelope.topic,
            shop: &envelope.shop,
            webhook_id: envelope.webhook_id.as_deref(),
        };

        match handler.handle(&ctx, body) {
            Ok(ack) => HandlerResult::Acknowledged(ack),
            Err(e) => {
                warn!(topic = %envelope.topic, shop = %envelope.shop, error = %e, "webhook_handler_rejected");
                HandlerResult::Rejected(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn envelope(topic: &str, body: &'static [u8]) -> WebhookEnvelope {
        WebhookEnvelope {
            raw_body: Bytes::from_static(body),
            signature_header: None,
            topic: topic.to_string(),
            shop: "test.myshopify.com".to_string(),
            webhook_id: None,
        }
    }

    fn echo_topic(ctx: &WebhookContext<'_>, _body: Value) -> Result<Acknowledgement, HandlerError> {
        Ok(Acknowledgement::new(format!("{} from {}", ctx.topic, ctx.shop)))
    }

    fn replaced(_ctx: &WebhookContext<'_>, _body: Value) -> Result<Acknowledgement, HandlerError> {
        Ok(Acknowledgement::new("replaced"))
    }

    fn numeric_body(_ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError> {
        let id: u64 = serde_json::from_value(body)?;
        Ok(Acknowledgement::new(id.to_string()))
    }

    #[test]
    fn test_dispatch_exact_match() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("shop/redact", echo_topic);

        assert_eq!(
            dispatcher.dispatch(&envelope("shop/redact", b"{}")),
            HandlerResult::Acknowledged(Acknowledgement::new("shop/redact from test.myshopify.com"))
        );
        assert_eq!(
            dispatcher.dispatch(&envelope("SHOP/REDACT", b"{}")),
            HandlerResult::NotFound
        );
    }

    #[test]
    fn test_unknown_topic_ignores_body() {
        let dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.dispatch(&envelope("products/update", b"not json")),
            HandlerResult::NotFound
        );
        assert_eq!(dispatcher.dispatch(&envelope("", b"{}")), HandlerResult::NotFound);
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("shop/redact", echo_topic);

        assert!(matches!(
            dispatcher.dispatch(&envelope("shop/redact", b"{not json")),
            HandlerResult::Rejected(_)
        ));
    }

    #[test]
    fn test_handler_error_is_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("orders/create", numeric_body);

        assert!(matches!(
            dispatcher.dispatch(&envelope("orders/create", b"{\"id\": 1}")),
            HandlerResult::Rejected(reason) if reason.starts_with("payload does not match topic")
        ));
    }

    #[test]
    fn test_register_replaces_and_lists_topics() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register("orders/paid", echo_topic)
            .register("app/uninstalled", echo_topic)
            .register("orders/paid", replaced);

        assert_eq!(dispatcher.topics(), vec!["app/uninstalled", "orders/paid"]);
        assert!(dispatcher.handles("orders/paid"));
        assert_eq!(
            dispatcher.dispatch(&envelope("orders/paid", b"{}")),
            HandlerResult::Acknowledged(Acknowledgement::new("replaced"))
        );
    }
}
