//! HTTP surface of the service.
//!
//! - Receives platform webhooks and verifies their signatures
//! - Serves the tracking-number classification API
//! - Runs the OAuth install flow
//!
//! Handlers stay thin: verification lives in [`signature`], topic handling
//! in [`crate::webhook`], carrier detection in [`crate::carrier`].

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    auth_callback, auth_install, classify_json, classify_query, health, webhook_by_path,
    webhook_combined, AppState, HealthResponse, WebhookResponse,
};
pub use signature::{configured_secret, SignatureEncoding};

/// Every route the web binary serves.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks", post(webhook_combined))
        .route("/webhooks/compliance", post(webhook_combined))
        .route("/webhooks/:resource/:event", post(webhook_by_path))
        .route("/api/shopify/webhooks", post(webhook_combined))
        .route("/api/classify", get(classify_query).post(classify_json))
        .route("/auth", get(auth_install))
        .route("/auth/callback", get(auth_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
