//! Sweep-based liquidator: drains a position into the book a chunk at a time
//! rather than dumping the whole size in one marketable order, to avoid
//! crashing the price against ourselves.

use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{Order, TokenId};
use crate::error::ExchangeError;
use crate::exchange::ExchangeProvider;

/// How many sweeps we'll attempt before giving up on a full exit.
const DEFAULT_MAX_SWEEPS: u32 = 6;
/// Pause between sweeps so the book has a chance to refill.
const DEFAULT_SWEEP_DELAY: Duration = Duration::from_secs(1);

/// Outcome of a (possibly partial) exit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitResult {
    pub sold: Decimal,
    pub remaining: Decimal,
}

impl ExitResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining <= Decimal::ZERO
    }
}

/// Drains a position against live bids, never selling below `min_price`.
pub struct SmartExecutor<'a> {
    exchange: &'a dyn ExchangeProvider,
}

impl<'a> SmartExecutor<'a> {
    #[must_use]
    pub fn new(exchange: &'a dyn ExchangeProvider) -> Self {
        Self { exchange }
    }

    /// Sell up to `total_size` of `token_id`, sweeping the book in chunks
    /// bounded by bid depth at or above `min_price`, for up to
    /// [`DEFAULT_MAX_SWEEPS`] rounds with a [`DEFAULT_SWEEP_DELAY`] pause
    /// between them.
    pub async fn exit_position(&self, token_id: &TokenId, total_size: Decimal, min_price: Decimal) -> ExitResult {
        let mut remaining = total_size;
        let mut sold_total = Decimal::ZERO;

        for sweep in 0..DEFAULT_MAX_SWEEPS {
            if remaining <= Decimal::ZERO {
                break;
            }

            let book = match self.exchange.get_order_book(token_id).await {
                Ok(book) => book,
                Err(e) => {
                    warn!(target: "risk", token_id = %token_id, error = %e, "failed to fetch order book during exit sweep");
                    break;
                }
            };

            let fillable_levels = book.bids_at_or_above(min_price);
            let fillable_qty: Decimal = fillable_levels.iter().map(|l| l.size).sum();

            let chunk_size = floor_hundredths(remaining.min(fillable_qty));
            if chunk_size <= Decimal::ZERO {
                info!(
                    target: "risk",
                    token_id = %token_id,
                    sweep,
                    remaining = %remaining,
                    "no fillable bids at or above floor, waiting"
                );
                if sweep + 1 < DEFAULT_MAX_SWEEPS {
                    tokio::time::sleep(DEFAULT_SWEEP_DELAY).await;
                }
                continue;
            }

            let order = Order::new_sell(token_id.clone(), chunk_size, min_price);
            match self.exchange.place_order(&order).await {
                Ok(order_id) => {
                    info!(target: "risk", token_id = %token_id, order_id = %order_id, size = %chunk_size, price = %min_price, "exit sweep filled");
                    sold_total += chunk_size;
                    remaining -= chunk_size;
                }
                Err(e) => {
                    self.log_sweep_error(token_id, &e);
                }
            }

            if remaining > Decimal::ZERO && sweep + 1 < DEFAULT_MAX_SWEEPS {
                tokio::time::sleep(DEFAULT_SWEEP_DELAY).await;
            }
        }

        if remaining > Decimal::ZERO {
            warn!(target: "risk", token_id = %token_id, sold = %sold_total, remaining = %remaining, "exit incomplete after max sweeps");
        } else {
            info!(target: "risk", token_id = %token_id, sold = %sold_total, "exit complete");
        }

        ExitResult { sold: sold_total, remaining }
    }

    fn log_sweep_error(&self, token_id: &TokenId, error: &ExchangeError) {
        warn!(target: "risk", token_id = %token_id, error = %error, "exit sweep order failed");
    }
}

/// Floor to 2 decimals (the size precision the exchange accepts).
fn floor_hundredths(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero)
}
