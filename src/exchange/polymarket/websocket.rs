//! Streaming order-book client for the Polymarket CLOB market feed.
//!
//! Maintains a single WebSocket connection for a set of subscribed tokens,
//! answers ping frames with pong to keep the connection alive, and pushes
//! every book snapshot into the shared [`OrderBookCache`]. Unlike a bare
//! connection handler, [`OrderBookStream::run`] never returns on its own: a
//! dropped connection is logged and retried after a fixed delay, forever.
//!
//! [`OrderBookCache`]: crate::cache::OrderBookCache

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::messages::{SubscribeMessage, WsMessage};
use crate::cache::OrderBookCache;
use crate::domain::TokenId;
use crate::error::Result;

/// How long to wait after a dropped connection before retrying.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the Polymarket market WebSocket and keeps an [`OrderBookCache`]
/// up to date, reconnecting with a fixed delay on any failure.
pub struct OrderBookStream {
    url: String,
}

impl OrderBookStream {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    async fn connect(&self) -> Result<WsStream> {
        info!(target: "exchange", url = %self.url, "connecting to market data stream");
        let (ws, response) = connect_async(&self.url).await?;
        info!(target: "exchange", status = %response.status(), "market data stream connected");
        Ok(ws)
    }

    async fn subscribe(ws: &mut WsStream, asset_ids: &[TokenId]) -> Result<()> {
        let ids: Vec<String> = asset_ids.iter().map(|t| t.as_str().to_string()).collect();
        let msg = SubscribeMessage::new(ids.clone());
        let json = serde_json::to_string(&msg)?;
        info!(target: "exchange", assets = ?ids, "subscribing to market data");
        ws.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Run the connect -> subscribe -> listen loop forever, reconnecting after
    /// [`RECONNECT_DELAY`] whenever the connection drops or fails.
    pub async fn run(&self, token_ids: Vec<TokenId>, cache: &OrderBookCache) -> ! {
        loop {
            match self.connect_and_listen(&token_ids, cache).await {
                Ok(()) => {
                    warn!(target: "exchange", "market data stream closed cleanly, reconnecting");
                }
                Err(e) => {
                    error!(target: "exchange", error = %e, "market data stream failed, reconnecting");
                }
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn connect_and_listen(&self, token_ids: &[TokenId], cache: &OrderBookCache) -> Result<()> {
        let mut ws = self.connect().await?;
        Self::subscribe(&mut ws, token_ids).await?;

        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!(target: "exchange", raw = %text, "market data message");
                    match serde_json::from_str::<WsMessage>(&text) {
                        Ok(WsMessage::Book(book)) => {
                            let (token_id, depth) = book.to_depth();
                            cache.update(token_id, depth);
                        }
                        Ok(WsMessage::PriceChange(_) | WsMessage::TickSizeChange(_) | WsMessage::Unknown) => {}
                        Err(e) => {
                            warn!(target: "exchange", error = %e, raw = %text, "failed to parse market data message");
                        }
                    }
                }
                Ok(Message::Ping(data)) => {
                    ws.send(Message::Pong(data)).await?;
                }
                Ok(Message::Close(frame)) => {
                    info!(target: "exchange", frame = ?frame, "market data stream closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }
}
