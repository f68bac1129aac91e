//! Webhook topics this service subscribes to.

use std::fmt;

/// A known webhook topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CustomersDataRequest,
    CustomersRedact,
    ShopRedact,
    OrdersCreate,
    OrdersPaid,
    OrdersFulfilled,
    AppUninstalled,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::CustomersDataRequest,
        Topic::CustomersRedact,
        Topic::ShopRedact,
        Topic::OrdersCreate,
        Topic::OrdersPaid,
        Topic::OrdersFulfilled,
        Topic::AppUninstalled,
    ];

    /// The topic string exactly as the platform sends it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CustomersDataRequest => "customers/data_request",
            Topic::CustomersRedact => "customers/redact",
            Topic::ShopRedact => "shop/redact",
            Topic::OrdersCreate => "orders/create",
            Topic::OrdersPaid => "orders/paid",
            Topic::OrdersFulfilled => "orders/fulfilled",
            Topic::AppUninstalled => "app/uninstalled",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn parse(topic: &str) -> Option<Topic> {
        Self::ALL.into_iter().find(|t| t.as_str() == topic)
    }

    /// Mandatory privacy topics. These are configured in the app settings
    /// rather than subscribed per shop.
    pub fn is_compliance(&self) -> bool {
        matches!(
            self,
            Topic::CustomersDataRequest | Topic::CustomersRedact | Topic::ShopRedact
        )
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
