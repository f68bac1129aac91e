//! Webhook intake: envelopes, topics and dispatch.
//!
//! ## Flow
//!
//! ```text
//! raw request → WebhookEnvelope → verify → Dispatcher → TopicHandler → ack
//! ```

pub mod dispatch;
pub mod envelope;
pub mod handlers;
pub mod payloads;
pub mod topic;

pub use dispatch::{
    Acknowledgement, Dispatcher, HandlerError, HandlerResult, TopicHandler, WebhookContext,
};
pub use envelope::{
    WebhookEnvelope, HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER, WEBHOOK_ID_HEADER,
};
pub use handlers::{Detection, FulfillmentHandler, UNKNOWN_CARRIER};
pub use topic::Topic;
