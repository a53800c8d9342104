//! Wire types for the Polymarket CLOB WebSocket market feed.

use serde::{Deserialize, Serialize};

use crate::domain::{MarketDepth, MarketDepthLevel, TokenId};

/// Subscription request sent once per connection for the asset ids we care about.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl SubscribeMessage {
    #[must_use]
    pub fn new(asset_ids: Vec<String>) -> Self {
        Self {
            assets_ids: asset_ids,
            msg_type: "market".to_string(),
        }
    }
}

/// Messages received from the market feed.
#[derive(Debug, Deserialize)]
#[serde(tag = "event_type")]
pub enum WsMessage {
    #[serde(rename = "book")]
    Book(BookMessage),

    #[serde(rename = "price_change")]
    PriceChange(PriceChangeMessage),

    #[serde(rename = "tick_size_change")]
    TickSizeChange(serde_json::Value),

    #[serde(other)]
    Unknown,
}

/// A full order-book snapshot for one asset.
#[derive(Debug, Deserialize)]
pub struct BookMessage {
    pub asset_id: String,
    pub market: Option<String>,
    pub bids: Vec<WsPriceLevel>,
    pub asks: Vec<WsPriceLevel>,
    pub timestamp: Option<String>,
    pub hash: Option<String>,
}

impl BookMessage {
    /// Convert this message into a domain [`MarketDepth`], dropping any level
    /// whose price or size fails to parse as a decimal.
    #[must_use]
    pub fn to_depth(&self) -> (TokenId, MarketDepth) {
        let token_id = TokenId::from(self.asset_id.clone());
        let depth = MarketDepth {
            bids: Self::parse_levels(&self.bids),
            asks: Self::parse_levels(&self.asks),
            min_order_size: Default::default(),
        };
        (token_id, depth)
    }

    fn parse_levels(levels: &[WsPriceLevel]) -> Vec<MarketDepthLevel> {
        levels
            .iter()
            .filter_map(|pl| {
                Some(MarketDepthLevel {
                    price: pl.price.parse().ok()?,
                    size: pl.size.parse().ok()?,
                })
            })
            .collect()
    }
}

/// An incremental top-of-book price change. We currently only trigger a REST
/// refresh on these rather than apply them incrementally.
#[derive(Debug, Deserialize)]
pub struct PriceChangeMessage {
    pub asset_id: String,
    pub market: Option<String>,
    pub price: Option<String>,
    pub changes: Option<Vec<WsPriceLevel>>,
}

/// Price level as received over the wire (strings, not decimals).
#[derive(Debug, Clone, Deserialize)]
pub struct WsPriceLevel {
    pub price: String,
    pub size: String,
}
