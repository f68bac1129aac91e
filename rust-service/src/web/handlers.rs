//! HTTP endpoint handlers.
//!
//! Webhook handlers verify the signature over the raw body before anything
//! else reads it, then hand the envelope to the topic dispatcher. Handlers
//! never block on outbound calls; webhook registration after install runs
//! in a background task.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Redirect,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::carrier::{ClassificationReport, Classifier};
use crate::error::AppError;
use crate::oauth::ShopifyOAuth;
use crate::web::signature::configured_secret;
use crate::webhook::{Dispatcher, HandlerResult, WebhookEnvelope};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub classifier: Arc<Classifier>,
    pub dispatcher: Arc<Dispatcher>,
    pub oauth: ShopifyOAuth,
}

impl AppState {
    pub fn new(
        config: Config,
        classifier: Arc<Classifier>,
        dispatcher: Dispatcher,
        oauth: ShopifyOAuth,
    ) -> Self {
        Self {
            config: Arc::new(config),
            classifier,
            dispatcher: Arc::new(dispatcher),
            oauth,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Webhooks
// =============================================================================

/// Body of every acknowledged webhook.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl WebhookResponse {
    fn acknowledged(message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            details,
        }
    }
}

/// `POST /webhooks/:resource/:event`: the path names the topic.
pub async fn webhook_by_path(
    State(state): State<AppState>,
    Path((resource, event)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let path_topic = format!("{}/{}", resource, event);
    if let Some(header_topic) = WebhookEnvelope::header_topic(&headers) {
        if header_topic != path_topic {
            warn!(
                path_topic = %path_topic,
                header_topic = %header_topic,
                "webhook_topic_mismatch"
            );
        }
    }

    let envelope = WebhookEnvelope::from_request(&headers, body, Some(path_topic));
    handle_webhook(&state, envelope)
}

/// `POST /webhooks` and the compliance aliases: `X-Shopify-Topic` names
/// the topic.
pub async fn webhook_combined(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let envelope = WebhookEnvelope::from_request(&headers, body, None);
    handle_webhook(&state, envelope)
}

fn handle_webhook(
    state: &AppState,
    envelope: WebhookEnvelope,
) -> Result<Json<WebhookResponse>, AppError> {
    info!(
        topic = %envelope.topic,
        shop = %envelope.shop,
        webhook_id = ?envelope.webhook_id,
        body_length = envelope.raw_body.len(),
        has_signature = envelope.signature_header.is_some(),
        "webhook_received"
    );

    let secret = configured_secret(&state.config.webhook_secret).ok_or_else(|| {
        AppError::Configuration("SHOPIFY_WEBHOOK_SECRET is not set".to_string())
    })?;

    if !envelope.verify(secret, state.config.signature_encoding) {
        warn!(topic = %envelope.topic, shop = %envelope.shop, "webhook_signature_invalid");
        return Err(AppError::Unauthorized);
    }

    match state.dispatcher.dispatch(&envelope) {
        HandlerResult::Acknowledged(ack) => {
            info!(topic = %envelope.topic, shop = %envelope.shop, acknowledgement = %ack.message, "webhook_processed");
            Ok(Json(WebhookResponse::acknowledged(ack.message, ack.details)))
        }
        HandlerResult::NotFound => Ok(Json(WebhookResponse::acknowledged(
            format!("No handler for topic '{}'", envelope.topic),
            None,
        ))),
        HandlerResult::Rejected(reason) => Err(AppError::MalformedPayload(format!(
            "{} ({})",
            reason, envelope.topic
        ))),
    }
}

// =============================================================================
// Classification API
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ClassifyQuery {
    pub number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub tracking_number: String,
}

/// `GET /api/classify?number=...`
pub async fn classify_query(
    State(state): State<AppState>,
    Query(query): Query<ClassifyQuery>,
) -> Result<Json<ClassificationReport>, AppError> {
    classify(&state.classifier, query.number.as_deref().unwrap_or_default())
}

/// `POST /api/classify` with `{"tracking_number": "..."}`
pub async fn classify_json(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassificationReport>, AppError> {
    classify(&state.classifier, &request.tracking_number)
}

fn classify(classifier: &Classifier, input: &str) -> Result<Json<ClassificationReport>, AppError> {
    if input.trim().is_empty() {
        return Err(AppError::BadRequest("tracking number is required".to_string()));
    }

    let report = classifier.report(input);
    info!(
        normalized = %report.normalized,
        matched = report.matched,
        carrier = ?report.best.as_ref().map(|b| b.result.carrier.as_str()),
        "tracking_number_classified"
    );
    Ok(Json(report))
}

// =============================================================================
// OAuth install
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    pub shop: Option<String>,
}

/// `GET /auth?shop=...`: redirect to the authorize page.
pub async fn auth_install(
    State(state): State<AppState>,
    Query(query): Query<InstallQuery>,
) -> Result<Redirect, AppError> {
    let shop = query
        .shop
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing shop parameter".to_string()))?;

    let url = state.oauth.begin_install(shop).await?;
    Ok(Redirect::to(url.as_str()))
}

/// `GET /auth/callback`: verify, exchange the code and send the browser to
/// the frontend. Webhook subscriptions are created in the background.
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let (shop, token) = state.oauth.complete_install(&params).await?;
    let redirect = state.oauth.frontend_redirect(&shop, &token)?;

    let oauth = state.oauth.clone();
    tokio::spawn(async move {
        let outcomes = oauth.register_webhooks(&shop, &token).await;
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            shop = %shop,
            registered = outcomes.len() - failed,
            failed = failed,
            "webhook_registration_finished"
        );
    });

    Ok(Redirect::to(redirect.as_str()))
}
