//! A concurrent, read-optimized cache of the latest order book per token.
//!
//! Updates arrive from the streaming market-data client and are applied
//! behind a `parking_lot::RwLock`. Callers that need to react to changes
//! (rather than poll) can subscribe to a broadcast channel of snapshots.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::domain::{MarketDepth, TokenId};

/// A cache update, sent to subscribers after every `update()` call.
#[derive(Debug, Clone)]
pub struct OrderBookUpdate {
    pub token_id: TokenId,
    pub depth: MarketDepth,
}

/// Latest-known order book per token, with optional change notifications.
pub struct OrderBookCache {
    books: RwLock<HashMap<TokenId, MarketDepth>>,
    notify: Option<broadcast::Sender<OrderBookUpdate>>,
}

impl OrderBookCache {
    /// A cache with no notification channel; readers must poll `get`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            notify: None,
        }
    }

    /// A cache that also broadcasts every update on a channel of the given
    /// capacity; lagging subscribers just miss intermediate snapshots.
    #[must_use]
    pub fn with_notifications(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            books: RwLock::new(HashMap::new()),
            notify: Some(tx),
        }
    }

    /// Subscribe to update notifications. Returns `None` if this cache was
    /// built with [`OrderBookCache::new`].
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<OrderBookUpdate>> {
        self.notify.as_ref().map(broadcast::Sender::subscribe)
    }

    /// Replace the cached book for `token_id` and notify subscribers.
    pub fn update(&self, token_id: TokenId, depth: MarketDepth) {
        if let Some(tx) = &self.notify {
            let _ = tx.send(OrderBookUpdate {
                token_id: token_id.clone(),
                depth: depth.clone(),
            });
        }
        self.books.write().insert(token_id, depth);
    }

    /// Snapshot of the current cached book for one token, if known.
    #[must_use]
    pub fn get(&self, token_id: &TokenId) -> Option<MarketDepth> {
        self.books.read().get(token_id).cloned()
    }

    /// Snapshot for two tokens at once (the common yes/no pair lookup).
    #[must_use]
    pub fn get_pair(&self, a: &TokenId, b: &TokenId) -> (Option<MarketDepth>, Option<MarketDepth>) {
        let books = self.books.read();
        (books.get(a).cloned(), books.get(b).cloned())
    }

    /// Snapshot for any number of tokens, skipping ones we have no book for.
    #[must_use]
    pub fn get_many(&self, token_ids: &[TokenId]) -> HashMap<TokenId, MarketDepth> {
        let books = self.books.read();
        token_ids
            .iter()
            .filter_map(|id| books.get(id).map(|d| (id.clone(), d.clone())))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}

impl Default for OrderBookCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketDepthLevel;
    use rust_decimal_macros::dec;

    fn sample_depth() -> MarketDepth {
        MarketDepth {
            bids: vec![MarketDepthLevel { price: dec!(0.5), size: dec!(100) }],
            asks: vec![MarketDepthLevel { price: dec!(0.51), size: dec!(100) }],
            min_order_size: dec!(5.0),
        }
    }

    #[test]
    fn update_then_get_returns_latest() {
        let cache = OrderBookCache::new();
        let token = TokenId::new("t1");
        cache.update(token.clone(), sample_depth());
        assert!(cache.get(&token).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn get_pair_handles_missing_entries() {
        let cache = OrderBookCache::new();
        let a = TokenId::new("a");
        let b = TokenId::new("b");
        cache.update(a.clone(), sample_depth());
        let (got_a, got_b) = cache.get_pair(&a, &b);
        assert!(got_a.is_some());
        assert!(got_b.is_none());
    }

    #[tokio::test]
    async fn subscribers_are_notified_on_update() {
        let cache = OrderBookCache::with_notifications(8);
        let mut rx = cache.subscribe().unwrap();
        let token = TokenId::new("t1");
        cache.update(token.clone(), sample_depth());

        let update = rx.recv().await.unwrap();
        assert_eq!(update.token_id, token);
    }

    #[test]
    fn cache_without_notifications_has_no_subscriber() {
        let cache = OrderBookCache::new();
        assert!(cache.subscribe().is_none());
    }
}
