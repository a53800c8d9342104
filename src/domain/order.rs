//! Order side, status, and the order we submit to an [`ExchangeProvider`].
//!
//! [`ExchangeProvider`]: crate::exchange::ExchangeProvider

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, TokenId};

/// Which side of the book an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// Lifecycle status of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
    Cancelled,
}

/// A marketable-limit order, always FOK: either it fills at `price_limit` or it
/// doesn't go through at all. We never place resting limit orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub token_id: TokenId,
    pub market_name: Option<String>,
    pub side: Side,
    pub size: Decimal,
    pub price_limit: Decimal,
    #[serde(default = "default_status")]
    pub status: OrderStatus,
    pub order_id: Option<OrderId>,
}

fn default_status() -> OrderStatus {
    OrderStatus::Pending
}

impl Order {
    #[must_use]
    pub fn new_buy(token_id: TokenId, size: Decimal, price_limit: Decimal) -> Self {
        Self {
            token_id,
            market_name: None,
            side: Side::Buy,
            size,
            price_limit,
            status: OrderStatus::Pending,
            order_id: None,
        }
    }

    #[must_use]
    pub fn new_sell(token_id: TokenId, size: Decimal, price_limit: Decimal) -> Self {
        Self {
            token_id,
            market_name: None,
            side: Side::Sell,
            size,
            price_limit,
            status: OrderStatus::Pending,
            order_id: None,
        }
    }

    #[must_use]
    pub fn with_market_name(mut self, name: impl Into<String>) -> Self {
        self.market_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_buy_defaults_to_pending() {
        let order = Order::new_buy(TokenId::new("t1"), dec!(5), dec!(0.5));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.side, Side::Buy);
        assert!(order.order_id.is_none());
    }

    #[test]
    fn side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
    }
}
