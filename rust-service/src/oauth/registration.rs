//! Webhook subscriptions created after install.

use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{info, warn};

use super::OAuthError;
use crate::webhook::Topic;

/// Topics subscribed per shop: every known topic except the compliance
/// ones, which are declared in the app configuration instead.
pub fn registered_topics() -> impl Iterator<Item = Topic> {
    Topic::ALL.into_iter().filter(|topic| !topic.is_compliance())
}

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug)]
pub struct RegistrationOutcome {
    pub topic: Topic,
    pub result: Result<(), OAuthError>,
}

/// Create a webhook subscription for every topic in [`registered_topics`].
///
/// Each topic is attempted even if an earlier one failed. A subscription
/// that already exists for the same address counts as success.
pub async fn register_webhooks(
    http: &Client,
    admin_base: &str,
    access_token: &str,
    api_version: &str,
    app_url: &str,
) -> Vec<RegistrationOutcome> {
    let endpoint = format!("{}/admin/api/{}/webhooks.json", admin_base, api_version);
    let mut outcomes = Vec::new();

    for topic in registered_topics() {
        let address = format!("{}/webhooks/{}", app_url, topic);
        let result = register_one(http, &endpoint, access_token, topic, &address).await;

        match &result {
            Ok(()) => info!(topic = %topic, address = %address, "webhook_registered"),
            Err(e) => warn!(topic = %topic, error = %e, "webhook_registration_failed"),
        }
        outcomes.push(RegistrationOutcome { topic, result });
    }

    outcomes
}

async fn register_one(
    http: &Client,
    endpoint: &str,
    access_token: &str,
    topic: Topic,
    address: &str,
) -> Result<(), OAuthError> {
    let body = json!({
        "webhook": {
            "topic": topic.as_str(),
            "address": address,
            "format": "json"
        }
    });

    let response = http
        .post(endpoint)
        .header(ACCESS_TOKEN_HEADER, access_token)
        .json(&body)
        .send()
        .await
        .map_err(|e| OAuthError::Registration {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

    match response.status() {
        s if s.is_success() => Ok(()),
        // "address for this topic has already been taken"
        StatusCode::UNPROCESSABLE_ENTITY => {
            info!(topic = %topic, "webhook_already_registered");
            Ok(())
        }
        s => Err(OAuthError::Registration {
            topic: topic.to_string(),
            reason: format!("status {}", s),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_registered_topics_skip_compliance() {
        let topics: Vec<Topic> = registered_topics().collect();
        assert_eq!(
            topics,
            vec![
                Topic::OrdersCreate,
                Topic::OrdersPaid,
                Topic::OrdersFulfilled,
                Topic::AppUninstalled
            ]
        );
    }

    #[tokio::test]
    async fn test_register_all_topics() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/admin/api/2024-01/webhooks.json")
            .match_header("x-shopify-access-token", "shpat_123")
            .with_status(201)
            .with_body(r#"{"webhook": {"id": 1}}"#)
            .expect(4)
            .create_async()
            .await;

        let outcomes = register_webhooks(
            &Client::new(),
            &server.url(),
            "shpat_123",
            "2024-01",
            "https://app.example.com",
        )
        .await;

        mock.assert_async().await;
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[tokio::test]
    async fn test_registration_sends_topic_address() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/admin/api/2024-01/webhooks.json")
            .match_body(Matcher::Json(json!({
                "webhook": {
                    "topic": "orders/fulfilled",
                    "address": "https://app.example.com/webhooks/orders/fulfilled",
                    "format": "json"
                }
            })))
            .with_status(201)
            .create_async()
            .await;
        let _others = server
            .mock("POST", "/admin/api/2024-01/webhooks.json")
            .with_status(201)
            .create_async()
            .await;

        register_webhooks(
            &Client::new(),
            &server.url(),
            "shpat_123",
            "2024-01",
            "https://app.example.com",
        )
        .await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_remaining_topics() {
        let mut server = Server::new_async().await;
        let _failing = server
            .mock("POST", "/admin/api/2024-01/webhooks.json")
            .match_body(Matcher::PartialJson(json!({"webhook": {"topic": "orders/create"}})))
            .with_status(500)
            .create_async()
            .await;
        let _taken = server
            .mock("POST", "/admin/api/2024-01/webhooks.json")
            .match_body(Matcher::PartialJson(json!({"webhook": {"topic": "orders/paid"}})))
            .with_status(422)
            .create_async()
            .await;
        let _ok = server
            .mock("POST", "/admin/api/2024-01/webhooks.json")
            .with_status(201)
            .create_async()
            .await;

        let outcomes = register_webhooks(
            &Client::new(),
            &server.url(),
            "shpat_123",
            "2024-01",
            "https://app.example.com",
        )
        .await;

        assert_eq!(outcomes.len(), 4);
        assert!(matches!(
            outcomes[0].result,
            Err(OAuthError::Registration { .. })
        ));
        assert!(outcomes[1].result.is_ok());
        assert!(outcomes[2].result.is_ok());
        assert!(outcomes[3].result.is_ok());
    }
}
