//! A held outcome-token position as tracked by the portfolio risk manager.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::TokenId;

/// An open (or formerly open) position in one outcome token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub token_id: TokenId,
    pub market_name: Option<String>,
    pub outcome: Option<String>,
    pub size: Decimal,
    pub average_entry_price: Decimal,
    #[serde(default)]
    pub current_price: Decimal,
}

impl Position {
    #[must_use]
    pub fn new(token_id: TokenId, size: Decimal, average_entry_price: Decimal) -> Self {
        Self {
            token_id,
            market_name: None,
            outcome: None,
            size,
            average_entry_price,
            current_price: average_entry_price,
        }
    }

    /// Current mark-to-market value of the position (`size * current_price`).
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.size * self.current_price
    }

    /// Cost basis (`size * average_entry_price`).
    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.size * self.average_entry_price
    }

    /// Update entry price and size for a repeat BUY on the same token, using a
    /// size-weighted average entry price.
    pub fn add_fill(&mut self, fill_size: Decimal, fill_price: Decimal) {
        let total_cost = self.cost() + fill_size * fill_price;
        self.size += fill_size;
        if self.size > Decimal::ZERO {
            self.average_entry_price = total_cost / self.size;
        }
    }

    /// Reduce the position's size after a partial or full exit.
    pub fn reduce(&mut self, sold_size: Decimal) {
        self.size = (self.size - sold_size).max(Decimal::ZERO);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.size <= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn value_and_cost_use_respective_prices() {
        let mut p = Position::new(TokenId::new("t"), dec!(10), dec!(0.5));
        p.current_price = dec!(0.6);
        assert_eq!(p.cost(), dec!(5.0));
        assert_eq!(p.value(), dec!(6.0));
    }

    #[test]
    fn add_fill_computes_weighted_average() {
        let mut p = Position::new(TokenId::new("t"), dec!(10), dec!(0.50));
        p.add_fill(dec!(10), dec!(0.60));
        assert_eq!(p.size, dec!(20));
        assert_eq!(p.average_entry_price, dec!(0.55));
    }

    #[test]
    fn reduce_never_goes_negative() {
        let mut p = Position::new(TokenId::new("t"), dec!(5), dec!(0.5));
        p.reduce(dec!(10));
        assert_eq!(p.size, Decimal::ZERO);
        assert!(p.is_closed());
    }
}
