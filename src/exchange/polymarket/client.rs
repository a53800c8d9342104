//! Live Polymarket adapter: CLOB order placement via `polymarket-client-sdk`,
//! everything else (balance, positions, metadata, order book fallback) via
//! plain REST against the data/gamma APIs.

use std::str::FromStr;
use std::sync::Arc;

use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use polymarket_client_sdk::auth::state::Authenticated;
use polymarket_client_sdk::auth::{Normal, Signer};
use polymarket_client_sdk::clob::types::Side as ClobSide;
use polymarket_client_sdk::clob::{Client as ClobClient, Config as ClobConfig};
use polymarket_client_sdk::types::U256;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{MarketDepth, MarketDepthLevel, MarketMetadata, Order, OrderId, Position, Side, TokenId};
use crate::error::ExchangeError;
use crate::exchange::ExchangeProvider;

type AuthenticatedClobClient = ClobClient<Authenticated<Normal>>;

/// Settings needed to stand up a live connection. Secrets (the private key)
/// never live in the config file; they're read from the process environment
/// by the caller and passed in here.
pub struct PolymarketConfig {
    pub clob_api: String,
    pub chain_id: u64,
    pub private_key: String,
    pub proxy_address: Option<String>,
    pub positions_api: String,
    pub gamma_api: String,
}

/// Live Polymarket CLOB adapter.
pub struct PolymarketProvider {
    clob: Arc<AuthenticatedClobClient>,
    signer: Arc<PrivateKeySigner>,
    http: reqwest::Client,
    user_address: Option<String>,
    positions_api: String,
    gamma_api: String,
}

impl PolymarketProvider {
    /// Authenticate against the CLOB and build the adapter.
    pub async fn connect(config: PolymarketConfig) -> Result<Self, ExchangeError> {
        let signer = PrivateKeySigner::from_str(&config.private_key)
            .map_err(|e| ExchangeError::Auth(format!("invalid wallet private key: {e}")))?
            .with_chain_id(Some(config.chain_id));

        info!(target: "exchange", chain_id = config.chain_id, address = %signer.address(), "authenticating polymarket client");

        let clob = ClobClient::new(&config.clob_api, ClobConfig::default())
            .map_err(|e| ExchangeError::Auth(format!("failed to create CLOB client: {e}")))?
            .authentication_builder(&signer)
            .authenticate()
            .await
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;

        Ok(Self {
            clob: Arc::new(clob),
            signer: Arc::new(signer),
            http: reqwest::Client::new(),
            user_address: config.proxy_address,
            positions_api: config.positions_api,
            gamma_api: config.gamma_api,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PositionRow {
    asset: Option<String>,
    size: Option<f64>,
    #[serde(rename = "initialValue")]
    initial_value: Option<f64>,
    redeemable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GammaMarket {
    title: Option<String>,
    question: Option<String>,
    #[serde(rename = "groupItemTitle")]
    group_item_title: Option<String>,
}

#[async_trait]
impl ExchangeProvider for PolymarketProvider {
    async fn get_balance(&self) -> Result<Decimal, ExchangeError> {
        // TODO: wire up the on-chain USDC collateral balance once the SDK
        // exposes `get_balance_allowance` for our client version; until then
        // operators must size `strategies.toml` budgets conservatively.
        Err(ExchangeError::Api(
            "balance query not yet implemented for the live adapter".to_string(),
        ))
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let Some(user) = self.user_address.as_deref() else {
            return Err(ExchangeError::Auth(
                "PROXY_ADDRESS or FUNDER must be set to query positions".to_string(),
            ));
        };

        let mut positions = Vec::new();
        let mut offset = 0u32;
        const LIMIT: u32 = 100;

        loop {
            let rows: Vec<PositionRow> = self
                .http
                .get(&self.positions_api)
                .query(&[
                    ("user", user),
                    ("sizeThreshold", "0"),
                    ("limit", &LIMIT.to_string()),
                    ("offset", &offset.to_string()),
                ])
                .send()
                .await
                .map_err(|e| ExchangeError::Api(format!("failed to fetch positions: {e}")))?
                .json()
                .await
                .map_err(|e| ExchangeError::Api(format!("failed to parse positions response: {e}")))?;

            let batch_len = rows.len();
            for row in rows {
                let size = row.size.unwrap_or(0.0);
                let is_open = size > 0.0 && row.redeemable != Some(true);
                if !is_open {
                    continue;
                }
                let Some(asset) = row.asset else { continue };
                let init_val = row.initial_value.unwrap_or(0.0);
                let avg_entry = if size > 0.0 { init_val / size } else { 0.0 };

                let Some(size_dec) = Decimal::from_f64_retain(size) else { continue };
                let Some(entry_dec) = Decimal::from_f64_retain(avg_entry) else { continue };
                positions.push(Position::new(TokenId::new(asset), size_dec, entry_dec));
            }

            if batch_len < LIMIT as usize {
                break;
            }
            offset += LIMIT;
        }

        Ok(positions)
    }

    async fn place_order(&self, order: &Order) -> Result<OrderId, ExchangeError> {
        let token_id_u256 = U256::from_str(order.token_id.as_str())
            .map_err(|e| ExchangeError::Order(format!("invalid token id {}: {e}", order.token_id)))?;

        let side = match order.side {
            Side::Buy => ClobSide::Buy,
            Side::Sell => ClobSide::Sell,
        };

        let built = self
            .clob
            .limit_order()
            .token_id(token_id_u256)
            .side(side)
            .price(order.price_limit)
            .size(order.size)
            .build()
            .await
            .map_err(|e| ExchangeError::Order(format!("failed to build order: {e}")))?;

        let signed = self
            .clob
            .sign(self.signer.as_ref(), built)
            .await
            .map_err(|e| ExchangeError::Order(format!("failed to sign order: {e}")))?;

        let response = self
            .clob
            .post_order(signed)
            .await
            .map_err(|e| ExchangeError::Api(format!("order submission failed: {e}")))?;

        info!(target: "exchange", order_id = %response.order_id, token_id = %order.token_id, side = ?order.side, size = %order.size, price = %order.price_limit, "order submitted");
        Ok(OrderId::new(response.order_id))
    }

    async fn get_order_book(&self, token_id: &TokenId) -> Result<MarketDepth, ExchangeError> {
        #[derive(Deserialize)]
        struct WireLevel {
            price: String,
            size: String,
        }
        #[derive(Deserialize)]
        struct WireBook {
            #[serde(default)]
            bids: Vec<WireLevel>,
            #[serde(default)]
            asks: Vec<WireLevel>,
            #[serde(default)]
            min_order_size: String,
        }

        let url = format!("{}/book", self.gamma_api.trim_end_matches('/'));
        let wire: WireBook = self
            .http
            .get(&url)
            .query(&[("token_id", token_id.as_str())])
            .send()
            .await
            .map_err(|e| ExchangeError::Api(format!("failed to fetch order book: {e}")))?
            .json()
            .await
            .map_err(|e| ExchangeError::Api(format!("failed to parse order book: {e}")))?;

        let parse = |levels: Vec<WireLevel>| -> Vec<MarketDepthLevel> {
            levels
                .into_iter()
                .filter_map(|l| {
                    Some(MarketDepthLevel {
                        price: l.price.parse().ok()?,
                        size: l.size.parse().ok()?,
                    })
                })
                .collect()
        };

        Ok(MarketDepth {
            bids: parse(wire.bids),
            asks: parse(wire.asks),
            min_order_size: wire.min_order_size.parse().unwrap_or_default(),
        })
    }

    async fn get_market_metadata(&self, token_id: &TokenId) -> MarketMetadata {
        let result: Result<Vec<GammaMarket>, reqwest::Error> = async {
            self.http
                .get(&self.gamma_api)
                .query(&[("clob_token_ids[]", token_id.as_str())])
                .send()
                .await?
                .json()
                .await
        }
        .await;

        match result {
            Ok(markets) => match markets.into_iter().next() {
                Some(m) => MarketMetadata {
                    title: m.title.unwrap_or_else(|| "Unknown".to_string()),
                    question: m.question.unwrap_or_else(|| "Unknown".to_string()),
                    group_name: m.group_item_title,
                    category: None,
                    status: None,
                    volume: None,
                    end_date: None,
                    outcomes: None,
                    score: None,
                },
                None => MarketMetadata::error("no market found for token"),
            },
            Err(e) => {
                warn!(target: "exchange", error = %e, token_id = %token_id, "failed to fetch market metadata");
                MarketMetadata::error(e.to_string())
            }
        }
    }
}
