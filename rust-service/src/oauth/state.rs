//! Anti-forgery state tokens for the install flow.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct PendingInstall {
    shop: String,
    expires_at: DateTime<Utc>,
}

/// In-memory store of issued state tokens.
///
/// Each token is bound to the shop it was issued for and can be consumed
/// once. Tokens do not survive a restart; an install interrupted by one is
/// simply started again.
#[derive(Clone)]
pub struct StateStore {
    pending: Arc<Mutex<HashMap<String, PendingInstall>>>,
    ttl: Duration,
}

impl StateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a fresh token for `shop`.
    pub async fn issue(&self, shop: &str) -> String {
        let token = generate_token();
        let install = PendingInstall {
            shop: shop.to_string(),
            expires_at: expiry(Utc::now(), self.ttl),
        };
        self.pending.lock().await.insert(token.clone(), install);
        token
    }

    /// Consume `token`. Succeeds only for a known, unexpired token issued
    /// for the same shop; the token is removed either way.
    pub async fn consume(&self, token: &str, shop: &str) -> bool {
        match self.pending.lock().await.remove(token) {
            Some(install) => install.shop == shop && Utc::now() <= install.expires_at,
            None => false,
        }
    }

    /// Drop expired tokens. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        let now = Utc::now();
        pending.retain(|_, install| install.expires_at > now);
        before - pending.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// `now + ttl`, saturating at the last representable instant.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = "test.myshopify.com";

    #[tokio::test]
    async fn test_issue_and_consume_once() {
        let store = StateStore::new(Duration::minutes(10));
        let token = store.issue(SHOP).await;

        assert_eq!(token.len(), 64);
        assert!(store.consume(&token, SHOP).await);
        assert!(!store.consume(&token, SHOP).await);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = StateStore::new(Duration::minutes(10));
        let a = store.issue(SHOP).await;
        let b = store.issue(SHOP).await;
        assert_ne!(a, b);
        assert_eq!(store.pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_consume_wrong_shop_burns_token() {
        let store = StateStore::new(Duration::minutes(10));
        let token = store.issue(SHOP).await;

        assert!(!store.consume(&token, "other.myshopify.com").await);
        assert!(!store.consume(&token, SHOP).await);
    }

    #[tokio::test]
    async fn test_consume_unknown_token() {
        let store = StateStore::new(Duration::minutes(10));
        assert!(!store.consume("forged", SHOP).await);
    }

    #[tokio::test]
    async fn test_expired_token() {
        let store = StateStore::new(Duration::seconds(-1));
        let token = store.issue(SHOP).await;
        assert!(!store.consume(&token, SHOP).await);
    }

    #[tokio::test]
    async fn test_huge_ttl_saturates_instead_of_overflowing() {
        let store = StateStore::new(Duration::max_value());
        let token = store.issue(SHOP).await;

        assert!(store.consume(&token, SHOP).await);
        assert_eq!(expiry(Utc::now(), Duration::max_value()), DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let expired = StateStore::new(Duration::seconds(-1));
        expired.issue(SHOP).await;
        expired.issue(SHOP).await;
        assert_eq!(expired.purge_expired().await, 2);
        assert_eq!(expired.pending_count().await, 0);

        let live = StateStore::new(Duration::minutes(10));
        live.issue(SHOP).await;
        assert_eq!(live.purge_expired().await, 0);
    }
}
