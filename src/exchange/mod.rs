//! The exchange boundary: a trait every CLOB adapter must honor, plus a live
//! Polymarket implementation and a mock for dry-run.

pub mod mock;
pub mod polymarket;

pub use mock::MockExchangeProvider;
pub use polymarket::PolymarketProvider;

use async_trait::async_trait;

use crate::domain::{MarketDepth, MarketMetadata, Order, OrderId, Position, TokenId};
use crate::error::ExchangeError;

/// Abstract boundary between the trading control plane and a concrete exchange.
///
/// Implementations must never let a metadata fetch fail the caller: on error they
/// return [`MarketMetadata::error`] rather than propagate, since metadata is used
/// for display and category filtering, not for anything budget-critical.
///
/// [`MarketMetadata::error`]: crate::domain::MarketMetadata::error
#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    /// Available collateral (USDC) balance for placing new orders.
    async fn get_balance(&self) -> Result<rust_decimal::Decimal, ExchangeError>;

    /// All currently open positions held by the operator's wallet.
    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError>;

    /// Submit a FOK marketable-limit order. Returns the exchange's order id on
    /// success.
    async fn place_order(&self, order: &Order) -> Result<OrderId, ExchangeError>;

    /// Current L2 depth for one outcome token.
    async fn get_order_book(&self, token_id: &TokenId) -> Result<MarketDepth, ExchangeError>;

    /// Market metadata for one outcome token. Never errors; returns a sentinel
    /// [`MarketMetadata::error`] value on any underlying failure.
    ///
    /// [`MarketMetadata::error`]: crate::domain::MarketMetadata::error
    async fn get_market_metadata(&self, token_id: &TokenId) -> MarketMetadata;

    /// Start any background connections (e.g. the streaming order-book client).
    /// Default no-op for adapters that don't need one.
    async fn start(&self) -> Result<(), ExchangeError> {
        Ok(())
    }

    /// Stop background connections. Default no-op.
    async fn stop(&self) -> Result<(), ExchangeError> {
        Ok(())
    }
}
