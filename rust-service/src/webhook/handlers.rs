//! Handlers for the subscribed webhook topics.
//!
//! Compliance handlers only record the request: this service keeps no
//! customer data beyond what passes through a single request, so there is
//! nothing to export or erase locally.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::dispatch::{Acknowledgement, Dispatcher, HandlerError, TopicHandler, WebhookContext};
use super::payloads::{
    AppUninstalledPayload, CustomerRedactPayload, DataRequestPayload, OrderPayload,
    ShopRedactPayload,
};
use super::topic::Topic;
use crate::carrier::Classifier;

/// Carrier reported for tracking numbers no pattern recognises.
pub const UNKNOWN_CARRIER: &str = "Unknown";

impl Dispatcher {
    /// A dispatcher with a handler for every topic in [`Topic::ALL`].
    pub fn with_default_handlers(classifier: Arc<Classifier>) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(Topic::CustomersDataRequest.as_str(), customers_data_request)
            .register(Topic::CustomersRedact.as_str(), customers_redact)
            .register(Topic::ShopRedact.as_str(), shop_redact)
            .register(Topic::OrdersCreate.as_str(), order_received)
            .register(Topic::OrdersPaid.as_str(), order_received)
            .register(Topic::OrdersFulfilled.as_str(), FulfillmentHandler::new(classifier))
            .register(Topic::AppUninstalled.as_str(), app_uninstalled);
        dispatcher
    }
}

// =============================================================================
// Compliance
// =============================================================================

fn customers_data_request(
    ctx: &WebhookContext<'_>,
    body: Value,
) -> Result<Acknowledgement, HandlerError> {
    let payload: DataRequestPayload = serde_json::from_value(body)?;

    info!(
        shop = %ctx.shop,
        shop_id = ?payload.shop_id,
        shop_domain = ?payload.shop_domain,
        customer_id = ?payload.customer.as_ref().and_then(|c| c.id),
        data_request_id = ?payload.data_request.as_ref().and_then(|r| r.id),
        orders_requested = payload.orders_requested.len(),
        "compliance_data_request"
    );

    Ok(Acknowledgement::new("Data request processed"))
}

fn customers_redact(
    ctx: &WebhookContext<'_>,
    body: Value,
) -> Result<Acknowledgement, HandlerError> {
    let payload: CustomerRedactPayload = serde_json::from_value(body)?;

    info!(
        shop = %ctx.shop,
        shop_id = ?payload.shop_id,
        shop_domain = ?payload.shop_domain,
        customer_id = ?payload.customer.as_ref().and_then(|c| c.id),
        orders_to_redact = ?payload.orders_to_redact,
        "compliance_customer_redact"
    );

    Ok(Acknowledgement::new("Customer data redacted"))
}

fn shop_redact(ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError> {
    let payload: ShopRedactPayload = serde_json::from_value(body)?;

    info!(
        shop = %ctx.shop,
        shop_id = ?payload.shop_id,
        shop_domain = ?payload.shop_domain,
        "compliance_shop_redact"
    );

    Ok(Acknowledgement::new("Shop data redacted"))
}

// =============================================================================
// Orders
// =============================================================================

fn order_received(ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError> {
    let order: OrderPayload = serde_json::from_value(body)?;

    info!(
        shop = %ctx.shop,
        topic = %ctx.topic,
        order_id = ?order.id,
        order_number = ?order.order_number,
        total_price = ?order.total_price,
        currency = ?order.currency,
        "order_received"
    );

    Ok(Acknowledgement::new(format!(
        "Order {} received for tracking",
        order.reference()
    )))
}

/// Carrier detected for one fulfillment tracking number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub fulfillment_id: Option<u64>,
    pub tracking_number: String,
    pub carrier: String,
    pub confidence: Option<u8>,
    /// Carrier name the merchant entered, if any
    pub declared_carrier: Option<String>,
}

/// `orders/fulfilled`: detects the carrier of every tracking number.
pub struct FulfillmentHandler {
    classifier: Arc<Classifier>,
}

impl FulfillmentHandler {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier }
    }

    pub fn detect(&self, order: &OrderPayload) -> Vec<Detection> {
        order
            .fulfillments
            .iter()
            .flat_map(|fulfillment| {
                fulfillment
                    .all_tracking_numbers()
                    .into_iter()
                    .map(move |number| (fulfillment, number))
            })
            .map(|(fulfillment, number)| {
                let best = self.classifier.best_match(number);
                Detection {
                    fulfillment_id: fulfillment.id,
                    tracking_number: best
                        .as_ref()
                        .map(|b| b.normalized.clone())
                        .unwrap_or_else(|| number.to_string()),
                    carrier: best
                        .as_ref()
                        .map(|b| b.carrier.clone())
                        .unwrap_or_else(|| UNKNOWN_CARRIER.to_string()),
                    confidence: best.as_ref().map(|b| b.confidence),
                    declared_carrier: fulfillment.tracking_company.clone(),
                }
            })
            .collect()
    }
}

impl TopicHandler for FulfillmentHandler {
    fn handle(&self, ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError> {
        let order: OrderPayload = serde_json::from_value(body)?;
        let detections = self.detect(&order);

        for detection in &detections {
            info!(
                shop = %ctx.shop,
                order_id = ?order.id,
                tracking_number = %detection.tracking_number,
                carrier = %detection.carrier,
                declared_carrier = ?detection.declared_carrier,
                "fulfillment_carrier_detected"
            );
        }

        Ok(Acknowledgement::new(format!(
            "Order {} fulfilled with {} tracking number(s)",
            order.reference(),
            detections.len()
        ))
        .with_details(json!({ "detections": detections })))
    }
}

// =============================================================================
// App lifecycle
// =============================================================================

fn app_uninstalled(ctx: &WebhookContext<'_>, body: Value) -> Result<Acknowledgement, HandlerError> {
    let payload: AppUninstalledPayload = serde_json::from_value(body)?;
    let shop = payload.shop_domain().unwrap_or(ctx.shop);

    info!(shop = %shop, shop_id = ?payload.id, "app_uninstalled");

    Ok(Acknowledgement::new("App uninstalled"))
}
