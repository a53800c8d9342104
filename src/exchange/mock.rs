//! In-memory exchange adapter used for `DRY_RUN` and tests.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketDepth, MarketDepthLevel, MarketMetadata, Order, OrderId, Position, Side, TokenId};
use crate::error::ExchangeError;
use crate::persistence;

use super::ExchangeProvider;

const DEFAULT_INITIAL_BALANCE: Decimal = dec!(10000.0);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MockState {
    balance: Decimal,
    positions: std::collections::HashMap<TokenId, Position>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            balance: DEFAULT_INITIAL_BALANCE,
            positions: std::collections::HashMap::new(),
        }
    }
}

/// Fills orders against a fixed dummy book and tracks balance/positions purely
/// in memory (persisted to `mock_state.json` between runs so a dry-run restart
/// doesn't lose its simulated portfolio).
pub struct MockExchangeProvider {
    state: RwLock<MockState>,
    state_path: PathBuf,
}

impl MockExchangeProvider {
    /// Create a mock provider, loading any previously-persisted state from
    /// `state_path` (e.g. `polybot/config/mock_state.json`).
    pub fn new(state_path: PathBuf) -> Self {
        let state = persistence::load_json(&state_path).unwrap_or_default();
        Self {
            state: RwLock::new(state),
            state_path,
        }
    }

    fn persist(&self) {
        let state = self.state.read();
        if let Err(e) = persistence::save_json(&self.state_path, &*state) {
            tracing::warn!(target: "exchange", error = %e, "failed to persist mock exchange state");
        }
    }
}

#[async_trait]
impl ExchangeProvider for MockExchangeProvider {
    async fn get_balance(&self) -> Result<Decimal, ExchangeError> {
        Ok(self.state.read().balance)
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        Ok(self.state.read().positions.values().cloned().collect())
    }

    async fn place_order(&self, order: &Order) -> Result<OrderId, ExchangeError> {
        let cost = order.size * order.price_limit;

        {
            let mut state = self.state.write();
            match order.side {
                Side::Buy => {
                    if cost > state.balance {
                        return Err(ExchangeError::InsufficientFunds(format!(
                            "need {cost} but balance is {}",
                            state.balance
                        )));
                    }
                    state.balance -= cost;
                    state
                        .positions
                        .entry(order.token_id.clone())
                        .and_modify(|p| p.add_fill(order.size, order.price_limit))
                        .or_insert_with(|| {
                            Position::new(order.token_id.clone(), order.size, order.price_limit)
                        });
                }
                Side::Sell => {
                    let held = state
                        .positions
                        .get(&order.token_id)
                        .map(|p| p.size)
                        .unwrap_or(Decimal::ZERO);
                    if order.size > held {
                        return Err(ExchangeError::Order(format!(
                            "cannot sell {} of {}, only hold {held}",
                            order.size, order.token_id
                        )));
                    }
                    state.balance += cost;
                    if let Some(pos) = state.positions.get_mut(&order.token_id) {
                        pos.reduce(order.size);
                        if pos.is_closed() {
                            state.positions.remove(&order.token_id);
                        }
                    }
                }
            }
        }

        self.persist();
        Ok(OrderId::new(uuid::Uuid::new_v4().to_string()))
    }

    async fn get_order_book(&self, _token_id: &TokenId) -> Result<MarketDepth, ExchangeError> {
        Ok(MarketDepth {
            bids: vec![
                MarketDepthLevel { price: dec!(0.50), size: dec!(1000) },
                MarketDepthLevel { price: dec!(0.49), size: dec!(2000) },
            ],
            asks: vec![
                MarketDepthLevel { price: dec!(0.51), size: dec!(1000) },
                MarketDepthLevel { price: dec!(0.52), size: dec!(2000) },
            ],
            min_order_size: dec!(5.0),
        })
    }

    async fn get_market_metadata(&self, token_id: &TokenId) -> MarketMetadata {
        MarketMetadata {
            title: format!("Mock Market {token_id}"),
            question: "Mock question?".to_string(),
            group_name: None,
            category: None,
            status: Some("active".to_string()),
            volume: Some(0.0),
            end_date: None,
            outcomes: None,
            score: None,
        }
    }
}
