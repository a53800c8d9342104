//! Polymarket CLOB adapter: live order placement/REST queries plus the
//! streaming order-book client.

mod client;
mod messages;
mod websocket;

pub use client::{PolymarketConfig, PolymarketProvider};
pub use messages::{BookMessage, WsMessage};
pub use websocket::OrderBookStream;
