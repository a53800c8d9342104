//! Polls each watched wallet's activity feed and emits [`TradeEvent`]s for
//! new BUY/SELL activity.
//!
//! Each wallet's `last_timestamps` cursor is seeded (not emitted) on first
//! observation, so a freshly-added target doesn't replay its entire history
//! as a flood of trade events the moment the bot starts.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::channel::DropOldestSender;
use crate::domain::{Side, TokenId, TradeEvent, WalletAddress, WalletTarget};
use crate::exchange::ExchangeProvider;

/// How often we poll every wallet's activity feed.
const POLL_INTERVAL: Duration = Duration::from_secs(3);
/// How many recent activity rows to request per poll.
const ACTIVITY_LIMIT: u32 = 3;

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    side: Option<String>,
    #[serde(default, rename = "usdcSize")]
    usdc_size: Option<f64>,
    #[serde(default)]
    asset: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default, rename = "marketSlug")]
    market_slug: Option<String>,
    #[serde(default)]
    outcome: Option<String>,
    timestamp: i64,
}

/// Periodic poller over a set of whale wallets, emitting [`TradeEvent`]s onto
/// a drop-oldest channel consumed by the portfolio risk manager.
pub struct WhaleMonitor {
    http: reqwest::Client,
    activity_api: String,
    targets: Mutex<Vec<WalletTarget>>,
    last_timestamps: Mutex<HashMap<WalletAddress, i64>>,
    tx: DropOldestSender<TradeEvent>,
}

impl WhaleMonitor {
    #[must_use]
    pub fn new(targets: Vec<WalletTarget>, activity_api: impl Into<String>, tx: DropOldestSender<TradeEvent>) -> Self {
        let last_timestamps = targets
            .iter()
            .map(|t| (t.address.clone(), 0))
            .collect();
        Self {
            http: reqwest::Client::new(),
            activity_api: activity_api.into(),
            targets: Mutex::new(targets),
            last_timestamps: Mutex::new(last_timestamps),
            tx,
        }
    }

    /// Replace the set of watched wallets, e.g. from a config hot-reload.
    pub fn set_targets(&self, targets: Vec<WalletTarget>) {
        let mut cursors = self.last_timestamps.lock();
        for target in &targets {
            cursors.entry(target.address.clone()).or_insert(0);
        }
        *self.targets.lock() = targets;
    }

    /// Poll forever, sleeping [`POLL_INTERVAL`] between rounds.
    pub async fn run(&self, exchange: &dyn ExchangeProvider) -> ! {
        loop {
            self.poll_all(exchange).await;
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn poll_all(&self, exchange: &dyn ExchangeProvider) {
        let targets = self.targets.lock().clone();
        let checks = targets.iter().map(|t| self.check_wallet(t, exchange));
        futures_util::future::join_all(checks).await;
    }

    async fn check_wallet(&self, target: &WalletTarget, exchange: &dyn ExchangeProvider) {
        let rows = match self.fetch_activity(&target.address).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(target: "whale", wallet = %target.address, error = %e, "failed to fetch activity");
                return;
            }
        };

        let Some(newest) = rows.iter().map(|r| r.timestamp).max() else {
            return;
        };

        let last = {
            let cursors = self.last_timestamps.lock();
            cursors.get(&target.address).copied().unwrap_or(0)
        };

        if last == 0 {
            // First observation for this wallet: seed the cursor without
            // emitting, so we don't replay old history as new trades.
            self.last_timestamps.lock().insert(target.address.clone(), newest);
            return;
        }

        if newest <= last {
            return;
        }

        self.last_timestamps.lock().insert(target.address.clone(), newest);
        self.process_activity(target, rows, last, exchange).await;
    }

    async fn fetch_activity(&self, address: &WalletAddress) -> Result<Vec<ActivityRow>, reqwest::Error> {
        self.http
            .get(&self.activity_api)
            .query(&[
                ("user", address.as_str()),
                ("limit", &ACTIVITY_LIMIT.to_string()),
                ("sortBy", "timestamp"),
                ("sortDirection", "desc"),
            ])
            .send()
            .await?
            .json()
            .await
    }

    async fn process_activity(
        &self,
        target: &WalletTarget,
        rows: Vec<ActivityRow>,
        last_timestamp: i64,
        exchange: &dyn ExchangeProvider,
    ) {
        for row in rows {
            if row.timestamp <= last_timestamp {
                continue;
            }
            if row.kind != "TRADE" && row.kind != "MATCH" {
                continue;
            }
            let Some(side_str) = row.side.as_deref() else { continue };
            let side = match side_str.to_ascii_uppercase().as_str() {
                "BUY" => Side::Buy,
                "SELL" => Side::Sell,
                _ => continue,
            };
            let Some(asset) = row.asset.clone() else { continue };
            if !asset.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let token_id = TokenId::new(asset);
            let usd_size = row.usdc_size.unwrap_or(0.0);
            let Some(usd_size) = rust_decimal::Decimal::from_f64_retain(usd_size) else { continue };

            let market_slug = row.slug.clone().or_else(|| row.market_slug.clone());

            let enriched_slug = match market_slug {
                Some(slug) => Some(slug),
                None => {
                    let metadata = exchange.get_market_metadata(&token_id).await;
                    if metadata.is_error() {
                        None
                    } else {
                        Some(metadata.title)
                    }
                }
            };

            info!(
                target: "whale",
                wallet = %target.name,
                address = %target.address,
                side = ?side,
                usd_size = %usd_size,
                market = ?enriched_slug,
                "🐳 whale trade observed"
            );

            let event = TradeEvent {
                source_wallet_name: target.name.clone(),
                source_wallet_address: target.address.clone(),
                token_id,
                market_slug: enriched_slug,
                outcome: row.outcome.clone(),
                side,
                usd_size,
                timestamp: row.timestamp,
            };

            self.tx.send(event);
        }
        debug!(target: "whale", wallet = %target.address, "finished processing activity batch");
    }
}
