//! Persisted bot state: positions, cumulative spend, and the set of tokens
//! we're actively managing. Serialized to `bot_state.json` by
//! [`crate::persistence`].

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::TokenId;
use super::position::Position;

/// Everything the portfolio risk manager needs to survive a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotState {
    pub positions: HashMap<TokenId, Position>,
    #[serde(default)]
    pub cumulative_spend: Decimal,
    #[serde(default)]
    pub managed_tokens: HashSet<TokenId>,
}

impl BotState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_buy(&mut self, token_id: TokenId, size: Decimal, price: Decimal, cost: Decimal) {
        self.positions
            .entry(token_id.clone())
            .and_modify(|p| p.add_fill(size, price))
            .or_insert_with(|| Position::new(token_id.clone(), size, price));
        self.cumulative_spend += cost;
        self.managed_tokens.insert(token_id);
    }

    pub fn record_exit(&mut self, token_id: &TokenId, sold_size: Decimal) {
        if let Some(pos) = self.positions.get_mut(token_id) {
            pos.reduce(sold_size);
            if pos.is_closed() {
                self.positions.remove(token_id);
            }
        }
    }

    #[must_use]
    pub fn is_managed(&self, token_id: &TokenId) -> bool {
        self.managed_tokens.contains(token_id)
    }

    #[must_use]
    pub fn total_position_value(&self) -> Decimal {
        self.positions.values().map(Position::value).sum()
    }
}
