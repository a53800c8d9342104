//! The portfolio risk manager: entry pipeline for mirrored buys, the
//! periodic stop-loss/take-profit scan, and periodic portfolio logging.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::ai::{AiAnalysisService, TradeContext};
use crate::domain::{build_buy_order, BotState, Order, Side, TokenId, TradeEvent};
use crate::exchange::ExchangeProvider;
use crate::persistence;

use super::config::RiskConfig;
use super::executor::SmartExecutor;
use super::override_window::ManualOverride;

/// Orchestrates the whole trading control plane's stateful decision making:
/// the entry pipeline invoked per [`TradeEvent`], the periodic risk scan,
/// and periodic portfolio logging.
pub struct PortfolioRiskManager {
    exchange: Arc<dyn ExchangeProvider>,
    ai: Arc<AiAnalysisService>,
    config: RwLock<RiskConfig>,
    state: Mutex<BotState>,
    state_path: PathBuf,
    trade_log_path: PathBuf,
    override_window: ManualOverride,
}

impl PortfolioRiskManager {
    pub fn new(
        exchange: Arc<dyn ExchangeProvider>,
        ai: Arc<AiAnalysisService>,
        config: RiskConfig,
        state_path: PathBuf,
        trade_log_path: PathBuf,
        override_dir: PathBuf,
    ) -> Self {
        let state = persistence::load_json(&state_path).unwrap_or_default();
        Self {
            exchange,
            ai,
            config: RwLock::new(config),
            state: Mutex::new(state),
            state_path,
            trade_log_path,
            override_window: ManualOverride::new(override_dir),
        }
    }

    pub fn update_config(&self, config: RiskConfig) {
        *self.config.write() = config;
    }

    fn persist_state(&self) {
        let state = self.state.lock();
        if let Err(e) = persistence::save_json(&self.state_path, &*state) {
            warn!(target: "risk", error = %e, "failed to persist bot state");
        }
    }

    fn log_trade(&self, event: &TradeEvent, order: &Order) {
        #[derive(serde::Serialize)]
        struct TradeLogEntry<'a> {
            timestamp: i64,
            whale: &'a str,
            token_id: &'a str,
            side: &'a str,
            size: Decimal,
            price: Decimal,
        }
        let entry = TradeLogEntry {
            timestamp: event.timestamp,
            whale: &event.source_wallet_name,
            token_id: order.token_id.as_str(),
            side: "BUY",
            size: order.size,
            price: order.price_limit,
        };
        if let Err(e) = persistence::append_jsonl(&self.trade_log_path, &entry) {
            warn!(target: "risk", error = %e, "failed to append trade log");
        }
    }

    /// Entry pipeline for one observed whale trade. Only BUY events can
    /// trigger a mirror; we never mirror a SELL, relying instead on our own
    /// stop-loss/take-profit exit logic.
    pub async fn on_trade_event(&self, event: TradeEvent) {
        if event.side != Side::Buy {
            return;
        }

        let metadata = self.exchange.get_market_metadata(&event.token_id).await;
        let market_label = format!("{} - {}", metadata.title, metadata.group_name.as_deref().unwrap_or("Outcome"));

        if self.config.read().is_blacklisted(&event.token_id) {
            warn!(target: "risk", token_id = %event.token_id, market = %market_label, "🛑 blacklisted token, skipping trade");
            return;
        }

        let context = TradeContext {
            whale_name: event.source_wallet_name.clone(),
            whale_address: event.source_wallet_address.as_str().to_string(),
            trade_size_usd: event.usd_size,
            outcome: event.outcome.clone(),
            market_slug: event.market_slug.clone(),
            trade_side: "BUY".to_string(),
            timestamp: event.timestamp,
        };

        let (sports_blocked, sports_reason) = self.ai.check_sports_filter(&event.token_id, &metadata, &context).await;
        if sports_blocked {
            warn!(target: "risk", market = %market_label, reason = %sports_reason, "🏈 blocked: sports filter");
            return;
        }

        let depth = match self.exchange.get_order_book(&event.token_id).await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(target: "risk", token_id = %event.token_id, error = %e, "failed to fetch order book");
                return;
            }
        };

        self.handle_buy_signal(&event, &market_label, depth, context).await;
    }

    async fn handle_buy_signal(&self, event: &TradeEvent, market_label: &str, depth: crate::domain::MarketDepth, context: TradeContext) {
        let analysis = self.ai.should_execute_trade(&context, &event.token_id).await;

        let ai_min_confidence = self.config.read().ai_min_confidence;
        if !analysis.should_trade {
            if analysis.confidence >= ai_min_confidence {
                warn!(target: "risk", market = %market_label, confidence = analysis.confidence, justification = %analysis.justification, "🤖 AI recommends skip, opening manual override window");
                let description = format!("mirror buy: {market_label} (AI confidence {:.0}%)", analysis.confidence * 100.0);
                if !self.override_window.request_approval(&description).await {
                    info!(target: "risk", market = %market_label, "⏭️ trade skipped (no manual override)");
                    return;
                }
                info!(target: "risk", market = %market_label, "👤 manual override accepted, proceeding with trade");
            } else {
                info!(target: "risk", market = %market_label, confidence = analysis.confidence, "🤖 AI recommends skip but low confidence, auto-proceeding");
            }
        } else {
            info!(target: "risk", market = %market_label, confidence = analysis.confidence, "🤖 AI analysis: ✅ proceed");
        }

        let balance = match self.exchange.get_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(target: "risk", error = %e, "failed to fetch balance");
                return;
            }
        };
        if balance < dec!(1.0) {
            warn!(target: "risk", "not enough funds to mirror");
            return;
        }

        let Some(best_ask) = depth.best_ask() else {
            warn!(target: "risk", market = %market_label, "no sellers found");
            return;
        };

        let min_share_price = self.config.read().min_share_price;
        if best_ask < min_share_price {
            warn!(target: "risk", price = %best_ask, min = %min_share_price, "🛑 price below minimum, skipping mirror");
            return;
        }

        let Some(plan) = build_buy_order(best_ask, crate::domain::MIN_ORDER_USD) else {
            warn!(target: "risk", market = %market_label, "could not construct a valid buy order");
            return;
        };

        let (cumulative_spend, max_budget) = {
            let state = self.state.lock();
            let config = self.config.read();
            (state.cumulative_spend, config.max_budget)
        };
        if cumulative_spend + plan.cost > max_budget {
            warn!(target: "risk", spend = %cumulative_spend, cost = %plan.cost, max = %max_budget, "🛑 max budget exceeded, skipping mirror");
            return;
        }

        info!(target: "risk", size = %plan.size, price = %plan.price, market = %market_label, "⚡ mirroring buy");

        let order = Order::new_buy(event.token_id.clone(), plan.size, plan.price).with_market_name(market_label);
        match self.exchange.place_order(&order).await {
            Ok(order_id) => {
                self.state.lock().record_buy(event.token_id.clone(), plan.size, plan.price, plan.cost);
                self.persist_state();
                self.log_trade(event, &order);
                info!(target: "risk", order_id = %order_id, spend = %(cumulative_spend + plan.cost), max = %max_budget, "💰 spend updated");
            }
            Err(e) => {
                warn!(target: "risk", error = %e, "failed to mirror buy");
            }
        }
    }

    /// Run the periodic stop-loss/take-profit scan forever.
    pub async fn monitor_risks(&self) -> ! {
        loop {
            let interval = self.config.read().risk_check_interval_seconds;
            match self.exchange.get_positions().await {
                Ok(positions) => {
                    let min_value = self.config.read().min_position_value;
                    let checks = positions
                        .iter()
                        .filter(|p| p.size > Decimal::ZERO && p.value() >= min_value)
                        .map(|p| self.check_position_risk(p));
                    futures_util::future::join_all(checks).await;
                }
                Err(e) => {
                    warn!(target: "risk", error = %e, "failed to fetch positions during risk scan");
                }
            }
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    async fn check_position_risk(&self, position: &crate::domain::Position) {
        let metadata = self.exchange.get_market_metadata(&position.token_id).await;

        let from_metadata = position.outcome.as_deref().and_then(|o| metadata.outcome_price(o));
        let market_price = match from_metadata {
            Some(price) => price,
            None => match self.exchange.get_order_book(&position.token_id).await {
                Ok(depth) => depth.best_bid().and_then(|p| p.to_f64()).unwrap_or(0.0),
                Err(_) => 0.0,
            },
        };

        if market_price == 0.0 {
            return;
        }

        let Some(market_price_dec) = Decimal::from_f64_retain(market_price) else { return };
        if position.average_entry_price == Decimal::ZERO {
            return;
        }
        let roi = (market_price_dec - position.average_entry_price) / position.average_entry_price;

        let config = self.config.read().clone();
        let is_crypto = self.ai.is_crypto_price_market(&metadata).await;
        let band = config.risk_band(is_crypto);
        let executor = SmartExecutor::new(self.exchange.as_ref());
        let ownership_tag = if self.state.lock().is_managed(&position.token_id) { "🤖 managed" } else { "📌 pre-existing" };

        let stop_loss_hits = roi < -band.stop_loss_pct
            && (band.stop_loss_hold_min_price == Decimal::ZERO || market_price_dec < band.stop_loss_hold_min_price);
        let take_profit_hits = roi > band.take_profit_pct
            && (band.take_profit_hold_min_price == Decimal::ZERO || market_price_dec < band.take_profit_hold_min_price);

        if stop_loss_hits {
            warn!(
                target: "risk",
                market = %metadata.question,
                size = %position.size,
                entry = %position.average_entry_price,
                now = %market_price_dec,
                roi_pct = (roi * dec!(100)).to_string(),
                ownership = ownership_tag,
                crypto_band = is_crypto,
                "📉 stop loss triggered"
            );
            let result = executor.exit_position(&position.token_id, position.size, dec!(0.01)).await;
            self.state.lock().record_exit(&position.token_id, result.sold);
            self.persist_state();
        } else if take_profit_hits {
            info!(
                target: "risk",
                market = %metadata.question,
                size = %position.size,
                entry = %position.average_entry_price,
                now = %market_price_dec,
                roi_pct = (roi * dec!(100)).to_string(),
                ownership = ownership_tag,
                crypto_band = is_crypto,
                "💰 take profit triggered"
            );
            let floor_price = market_price_dec * dec!(0.9);
            let result = executor.exit_position(&position.token_id, position.size / dec!(2), floor_price).await;
            self.state.lock().record_exit(&position.token_id, result.sold);
            self.persist_state();
        }
    }

    /// Periodically log a full portfolio summary.
    pub async fn monitor_portfolio_logging(&self) -> ! {
        loop {
            let interval_minutes = self.config.read().log_interval_minutes;
            match self.exchange.get_positions().await {
                Ok(positions) if positions.is_empty() => {
                    info!(target: "risk", "📊 portfolio report: no open positions");
                }
                Ok(positions) => {
                    let mut total_value = Decimal::ZERO;
                    for position in &positions {
                        if position.size <= Decimal::ZERO {
                            continue;
                        }
                        total_value += position.value();
                        info!(
                            target: "risk",
                            token_id = %position.token_id,
                            size = %position.size,
                            entry = %position.average_entry_price,
                            current = %position.current_price,
                            value = %position.value(),
                            "📊 position"
                        );
                    }
                    info!(target: "risk", total_value = %total_value, "📊 portfolio total value");
                }
                Err(e) => {
                    warn!(target: "risk", error = %e, "failed to fetch positions for portfolio report");
                }
            }
            tokio::time::sleep(Duration::from_secs(interval_minutes * 60)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiRateLimiter, RateLimiterConfig};
    use crate::domain::{MarketDepth, MarketDepthLevel, MarketMetadata, Position, WalletAddress};
    use crate::error::ExchangeError;
    use crate::exchange::MockExchangeProvider;
    use async_trait::async_trait;

    /// Exchange double with a configurable bid, used to drive deterministic
    /// ROI scenarios through `check_position_risk` directly.
    struct ScriptedExchange {
        bid: Mutex<Decimal>,
        placed_orders: Mutex<Vec<crate::domain::Order>>,
    }

    impl ScriptedExchange {
        fn new(bid: Decimal) -> Self {
            Self {
                bid: Mutex::new(bid),
                placed_orders: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl ExchangeProvider for ScriptedExchange {
        async fn get_balance(&self) -> Result<Decimal, ExchangeError> {
            Ok(dec!(10000))
        }
        async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
            Ok(vec![])
        }
        async fn place_order(&self, order: &crate::domain::Order) -> Result<crate::domain::OrderId, ExchangeError> {
            self.placed_orders.lock().push(order.clone());
            Ok(crate::domain::OrderId::new(format!("sell-{}", order.size)))
        }
        async fn get_order_book(&self, _token_id: &TokenId) -> Result<MarketDepth, ExchangeError> {
            let bid = *self.bid.lock();
            Ok(MarketDepth {
                bids: vec![MarketDepthLevel { price: bid, size: dec!(1000) }],
                asks: vec![],
                min_order_size: dec!(5.0),
            })
        }
        async fn get_market_metadata(&self, _token_id: &TokenId) -> MarketMetadata {
            MarketMetadata {
                title: "t".to_string(),
                question: "q".to_string(),
                group_name: None,
                category: None,
                status: None,
                volume: None,
                end_date: None,
                outcomes: None,
                score: None,
            }
        }
    }

    fn manager_with_exchange(exchange: Arc<dyn ExchangeProvider>, risk: RiskConfig) -> PortfolioRiskManager {
        let dir = tempfile::tempdir().unwrap();
        let rate_limiter = AiRateLimiter::new(RateLimiterConfig::new(100.0, 10, Duration::from_secs(5)));
        let ai = Arc::new(AiAnalysisService::new(
            Box::new(AlwaysApprove),
            rate_limiter,
            dir.path().join("ai_cache.json"),
            dir.path().join("ai_state.json"),
            1000,
        ));
        PortfolioRiskManager::new(
            exchange,
            ai,
            risk,
            dir.path().join("bot_state.json"),
            dir.path().join("trades.jsonl"),
            dir.path().join("override"),
        )
    }

    struct AlwaysApprove;

    #[async_trait]
    impl crate::ai::Analyzer for AlwaysApprove {
        async fn analyze_trade(&self, _context: &TradeContext) -> crate::error::Result<crate::domain::TradeAnalysis> {
            Ok(crate::domain::TradeAnalysis {
                should_trade: true,
                confidence: 0.95,
                justification: "fine".to_string(),
                risk_factors: vec![],
                opportunity_factors: vec![],
                estimated_resolution_time: None,
                subjectivity_score: Some(0.1),
            })
        }
        async fn is_sports_market(&self, _m: &crate::domain::MarketMetadata) -> crate::error::Result<bool> {
            Ok(false)
        }
        async fn evaluate_sports_selectivity(&self, _c: &TradeContext) -> crate::error::Result<crate::domain::SportsSelectivityResult> {
            Ok(crate::domain::SportsSelectivityResult { should_consider: true, reasoning: "ok".into() })
        }
        async fn is_crypto_price_market(&self, _m: &crate::domain::MarketMetadata) -> crate::error::Result<bool> {
            Ok(false)
        }
    }

    fn manager() -> PortfolioRiskManager {
        let dir = tempfile::tempdir().unwrap();
        let exchange: Arc<dyn ExchangeProvider> =
            Arc::new(MockExchangeProvider::new(dir.path().join("mock_state.json")));
        let rate_limiter = AiRateLimiter::new(RateLimiterConfig::new(100.0, 10, Duration::from_secs(5)));
        let ai = Arc::new(AiAnalysisService::new(
            Box::new(AlwaysApprove),
            rate_limiter,
            dir.path().join("ai_cache.json"),
            dir.path().join("ai_state.json"),
            1000,
        ));
        PortfolioRiskManager::new(
            exchange,
            ai,
            RiskConfig::default(),
            dir.path().join("bot_state.json"),
            dir.path().join("trades.jsonl"),
            dir.path().join("override"),
        )
    }

    #[tokio::test]
    async fn on_trade_event_ignores_sell_side() {
        let manager = manager();
        let event = TradeEvent {
            source_wallet_name: "whale".to_string(),
            source_wallet_address: WalletAddress::new("0xabc"),
            token_id: TokenId::new("t1"),
            market_slug: None,
            outcome: None,
            side: Side::Sell,
            usd_size: dec!(100),
            timestamp: 0,
        };
        manager.on_trade_event(event).await;
        assert!(manager.state.lock().positions.is_empty());
    }

    #[tokio::test]
    async fn on_trade_event_mirrors_buy_and_updates_state() {
        let manager = manager();
        let event = TradeEvent {
            source_wallet_name: "whale".to_string(),
            source_wallet_address: WalletAddress::new("0xabc"),
            token_id: TokenId::new("t1"),
            market_slug: Some("slug".to_string()),
            outcome: Some("Yes".to_string()),
            side: Side::Buy,
            usd_size: dec!(100),
            timestamp: 0,
        };
        manager.on_trade_event(event).await;
        assert!(!manager.state.lock().positions.is_empty());
    }

    #[tokio::test]
    async fn blacklisted_token_is_skipped() {
        let manager = manager();
        let token = TokenId::new("bad");
        manager.config.write().blacklisted_tokens.insert(token.clone());
        let event = TradeEvent {
            source_wallet_name: "whale".to_string(),
            source_wallet_address: WalletAddress::new("0xabc"),
            token_id: token,
            market_slug: None,
            outcome: None,
            side: Side::Buy,
            usd_size: dec!(100),
            timestamp: 0,
        };
        manager.on_trade_event(event).await;
        assert!(manager.state.lock().positions.is_empty());
    }

    #[tokio::test]
    async fn take_profit_hold_band_suppresses_exit_while_price_above_floor() {
        let exchange = Arc::new(ScriptedExchange::new(dec!(0.77)));
        let mut risk = RiskConfig::default();
        risk.take_profit_hold_min_price = dec!(0.75);
        let manager = manager_with_exchange(exchange.clone(), risk);

        let position = Position::new(TokenId::new("t1"), dec!(100), dec!(0.40));
        manager.check_position_risk(&position).await;

        assert!(exchange.placed_orders.lock().is_empty());
    }

    #[tokio::test]
    async fn take_profit_fires_once_price_drops_below_hold_floor() {
        let exchange = Arc::new(ScriptedExchange::new(dec!(0.74)));
        let mut risk = RiskConfig::default();
        risk.take_profit_hold_min_price = dec!(0.75);
        let manager = manager_with_exchange(exchange.clone(), risk);

        let position = Position::new(TokenId::new("t1"), dec!(100), dec!(0.40));
        manager.check_position_risk(&position).await;

        let orders = exchange.placed_orders.lock();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].size, dec!(50));
        // floor is market_price * 0.9, routed through an f64 round-trip like
        // the live price path; assert the ballpark rather than exact digits.
        assert!(orders[0].price_limit > dec!(0.66) && orders[0].price_limit < dec!(0.67));
    }

    #[tokio::test]
    async fn crypto_classification_switches_to_the_narrower_band() {
        let exchange = Arc::new(ScriptedExchange::new(dec!(0.33)));
        let mut risk = RiskConfig::default();
        risk.crypto_market_rules.enabled = true;
        risk.crypto_market_rules.stop_loss_pct = dec!(0.10);
        let dir = tempfile::tempdir().unwrap();
        let rate_limiter = AiRateLimiter::new(RateLimiterConfig::new(100.0, 10, Duration::from_secs(5)));
        let ai = Arc::new(AiAnalysisService::new(
            Box::new(AlwaysCrypto),
            rate_limiter,
            dir.path().join("ai_cache.json"),
            dir.path().join("ai_state.json"),
            1000,
        ));
        ai.update_crypto_market_config(true);
        let manager = PortfolioRiskManager::new(
            exchange.clone(),
            ai,
            risk,
            dir.path().join("bot_state.json"),
            dir.path().join("trades.jsonl"),
            dir.path().join("override"),
        );

        // roi = (0.33 - 0.40) / 0.40 = -0.175: inside the default 20% stop-loss
        // band (would not trigger), but past the crypto band's tighter 10%
        // threshold once the position is classified as crypto.
        let position = Position::new(TokenId::new("t1"), dec!(100), dec!(0.40));
        manager.check_position_risk(&position).await;
        assert_eq!(exchange.placed_orders.lock().len(), 1);
    }

    struct AlwaysCrypto;

    #[async_trait]
    impl crate::ai::Analyzer for AlwaysCrypto {
        async fn analyze_trade(&self, _context: &TradeContext) -> crate::error::Result<crate::domain::TradeAnalysis> {
            Ok(crate::domain::TradeAnalysis {
                should_trade: true,
                confidence: 0.95,
                justification: "fine".to_string(),
                risk_factors: vec![],
                opportunity_factors: vec![],
                estimated_resolution_time: None,
                subjectivity_score: Some(0.1),
            })
        }
        async fn is_sports_market(&self, _m: &crate::domain::MarketMetadata) -> crate::error::Result<bool> {
            Ok(false)
        }
        async fn evaluate_sports_selectivity(&self, _c: &TradeContext) -> crate::error::Result<crate::domain::SportsSelectivityResult> {
            Ok(crate::domain::SportsSelectivityResult { should_consider: true, reasoning: "ok".into() })
        }
        async fn is_crypto_price_market(&self, _m: &crate::domain::MarketMetadata) -> crate::error::Result<bool> {
            Ok(true)
        }
    }
}
