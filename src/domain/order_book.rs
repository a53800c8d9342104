//! L2 order book depth snapshot shape shared by the REST fallback and the
//! streaming cache.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price level in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDepthLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Bid/ask depth for one outcome token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketDepth {
    /// Sorted best-first (highest bid first) by convention; callers that need a
    /// guaranteed order should sort explicitly rather than trust the wire order.
    pub bids: Vec<MarketDepthLevel>,
    pub asks: Vec<MarketDepthLevel>,
    #[serde(default)]
    pub min_order_size: Decimal,
}

impl MarketDepth {
    /// Best (lowest) ask price, if the book has any asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.iter().map(|l| l.price).min()
    }

    /// Best (highest) bid price, if the book has any bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.iter().map(|l| l.price).max()
    }

    /// Bid levels at or above `min_price`, sorted best-price-first (highest first).
    #[must_use]
    pub fn bids_at_or_above(&self, min_price: Decimal) -> Vec<MarketDepthLevel> {
        let mut levels: Vec<MarketDepthLevel> = self
            .bids
            .iter()
            .copied()
            .filter(|l| l.price >= min_price)
            .collect();
        levels.sort_by(|a, b| b.price.cmp(&a.price));
        levels
    }
}
