//! Core domain types: identifiers, money, orders, positions, market data, and
//! the trade/analysis types that flow between the whale monitor, the AI
//! analysis service, and the portfolio risk manager.

pub mod analysis;
pub mod id;
pub mod market;
pub mod money;
pub mod order;
pub mod order_book;
pub mod position;
pub mod state;
pub mod trade;

pub use analysis::{SportsSelectivityResult, TradeAnalysis};
pub use id::{OrderId, TokenId, WalletAddress};
pub use market::MarketMetadata;
pub use money::{build_buy_order, floor2, BuyOrderPlan, MIN_ORDER_SIZE, MIN_ORDER_USD};
pub use order::{Order, OrderStatus, Side};
pub use order_book::{MarketDepth, MarketDepthLevel};
pub use position::Position;
pub use state::BotState;
pub use trade::{StrategyType, TradeEvent, WalletTarget};
