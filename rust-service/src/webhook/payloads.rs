//! Webhook payload types.
//!
//! Only the fields the handlers read are modelled; everything else in the
//! platform's payloads is ignored. Fields the platform may omit are optional.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataRequestRef {
    pub id: Option<u64>,
}

/// `customers/data_request`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataRequestPayload {
    pub shop_id: Option<u64>,
    pub shop_domain: Option<String>,
    pub customer: Option<Customer>,
    #[serde(default)]
    pub orders_requested: Vec<u64>,
    pub data_request: Option<DataRequestRef>,
}

/// `customers/redact`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerRedactPayload {
    pub shop_id: Option<u64>,
    pub shop_domain: Option<String>,
    pub customer: Option<Customer>,
    #[serde(default)]
    pub orders_to_redact: Vec<u64>,
}

/// `shop/redact`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopRedactPayload {
    pub shop_id: Option<u64>,
    pub shop_domain: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fulfillment {
    pub id: Option<u64>,
    pub tracking_company: Option<String>,
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_numbers: Vec<String>,
}

impl Fulfillment {
    /// Every distinct, non-blank tracking number on this fulfillment.
    pub fn all_tracking_numbers(&self) -> Vec<&str> {
        let mut numbers: Vec<&str> = Vec::new();
        let candidates = self
            .tracking_number
            .iter()
            .chain(self.tracking_numbers.iter())
            .map(|n| n.trim())
            .filter(|n| !n.is_empty());

        for number in candidates {
            if !numbers.contains(&number) {
                numbers.push(number);
            }
        }
        numbers
    }
}

/// `orders/create`, `orders/paid` and `orders/fulfilled`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    pub id: Option<u64>,
    pub order_number: Option<u64>,
    pub name: Option<String>,
    pub total_price: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub fulfillments: Vec<Fulfillment>,
}

impl OrderPayload {
    /// Human-facing order reference: the order number, else the name, else
    /// the id.
    pub fn reference(&self) -> String {
        self.order_number
            .map(|n| n.to_string())
            .or_else(|| self.name.clone())
            .or_else(|| self.id.map(|id| id.to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// `app/uninstalled` (the payload is the shop resource)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppUninstalledPayload {
    pub id: Option<u64>,
    pub domain: Option<String>,
    pub myshopify_domain: Option<String>,
}

impl AppUninstalledPayload {
    pub fn shop_domain(&self) -> Option<&str> {
        self.domain
            .as_deref()
            .or(self.myshopify_domain.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_request_ignores_unknown_fields() {
        let raw = r#"{
            "shop_id": 954889,
            "shop_domain": "example.myshopify.com",
            "orders_requested": [299938, 280263],
            "customer": {"id": 191167, "email": "john@example.com", "phone": "555-625-1199"},
            "data_request": {"id": 9999},
            "extra": true
        }"#;
        let payload: DataRequestPayload = serde_json::from_str(raw).unwrap();

        assert_eq!(payload.shop_id, Some(954889));
        assert_eq!(payload.orders_requested.len(), 2);
        assert_eq!(payload.customer.unwrap().id, Some(191167));
        assert_eq!(payload.data_request.unwrap().id, Some(9999));
    }

    #[test]
    fn test_empty_object_is_accepted() {
        let payload: CustomerRedactPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.customer.is_none());
        assert!(payload.orders_to_redact.is_empty());
    }

    #[test]
    fn test_fulfillment_tracking_numbers_deduplicated() {
        let fulfillment = Fulfillment {
            tracking_number: Some("1Z999AA1234567890".to_string()),
            tracking_numbers: vec![
                "1Z999AA1234567890".to_string(),
                " ".to_string(),
                "123456789012".to_string(),
            ],
            ..Default::default()
        };

        assert_eq!(
            fulfillment.all_tracking_numbers(),
            vec!["1Z999AA1234567890", "123456789012"]
        );
    }

    #[test]
    fn test_order_reference_fallbacks() {
        let mut order = OrderPayload {
            id: Some(820982911946154508),
            name: Some("#9999".to_string()),
            order_number: Some(1234),
            ..Default::default()
        };
        assert_eq!(order.reference(), "1234");

        order.order_number = None;
        assert_eq!(order.reference(), "#9999");

        order.name = None;
        assert_eq!(order.reference(), "820982911946154508");

        assert_eq!(OrderPayload::default().reference(), "unknown");
    }

    #[test]
    fn test_app_uninstalled_shop_domain() {
        let payload: AppUninstalledPayload =
            serde_json::from_str(r#"{"myshopify_domain": "shop.myshopify.com"}"#).unwrap();
        assert_eq!(payload.shop_domain(), Some("shop.myshopify.com"));
    }
}
