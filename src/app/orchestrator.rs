//! Application orchestration: wires the exchange, AI gate, whale monitor, and
//! portfolio risk manager together and runs them as a set of cooperating
//! tokio tasks until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ai::{AiAnalysisService, AiRateLimiter, AnthropicAnalyzer, GeminiAnalyzer, RateLimiterConfig};
use crate::cache::OrderBookCache;
use crate::channel::drop_oldest_channel;
use crate::error::Result;
use crate::exchange::{ExchangeProvider, MockExchangeProvider, PolymarketProvider};
use crate::exchange::polymarket::OrderBookStream;
use crate::risk::PortfolioRiskManager;
use crate::whale::WhaleMonitor;

use super::config::{AiProvider, AppConfig};

/// Size of the whale-trade event channel. Beyond this, the oldest unprocessed
/// event is dropped rather than blocking the poller.
const TRADE_EVENT_CAPACITY: usize = 256;
/// How often the config hot-reload task checks the strategy file's mtime.
const CONFIG_WATCH_INTERVAL: Duration = Duration::from_secs(5);

pub struct App;

impl App {
    /// Bootstrap every component from `config` and run until `Ctrl+C`.
    pub async fn run(config: AppConfig, config_path: std::path::PathBuf) -> Result<()> {
        std::fs::create_dir_all(&config.state.dir).ok();

        let exchange: Arc<dyn ExchangeProvider> = if config.dry_run {
            info!("dry run enabled, trading against the mock exchange");
            Arc::new(MockExchangeProvider::new(config.state.mock_exchange_path()))
        } else {
            let provider = PolymarketProvider::connect(config.polymarket_config()).await?;
            Arc::new(provider)
        };
        exchange.start().await?;

        let analyzer: Box<dyn crate::ai::Analyzer> = match config.ai.provider {
            AiProvider::Anthropic => Box::new(AnthropicAnalyzer::from_env(config.ai.model.clone())?),
            AiProvider::Gemini => Box::new(GeminiAnalyzer::from_env()?),
        };
        let rate_limiter = AiRateLimiter::new(RateLimiterConfig::new(
            config.ai.requests_per_second,
            config.ai.max_concurrent,
            Duration::from_secs(120),
        ));
        let ai = Arc::new(AiAnalysisService::new(
            analyzer,
            rate_limiter,
            config.state.ai_cache_path(),
            config.state.ai_request_state_path(),
            config.ai.max_requests,
        ));
        config.apply_to_ai(&ai);

        let risk_manager = Arc::new(PortfolioRiskManager::new(
            exchange.clone(),
            ai.clone(),
            config.risk.clone(),
            config.state.bot_state_path(),
            config.state.trade_log_path(),
            config.state.override_dir(),
        ));

        let (tx, mut rx) = drop_oldest_channel(TRADE_EVENT_CAPACITY);
        let whale_monitor = Arc::new(WhaleMonitor::new(config.targets.clone(), config.network.activity_api.clone(), tx));

        let cache = Arc::new(OrderBookCache::with_notifications(TRADE_EVENT_CAPACITY));
        let stream = OrderBookStream::new(config.network.ws_url.clone());
        // TODO: resubscribe to newly-opened positions' tokens as they appear
        // instead of only the tokens blacklisted/held at startup.
        let initial_tokens = config.blacklisted_tokens();

        let whale_for_poll = whale_monitor.clone();
        let exchange_for_poll = exchange.clone();
        let poll_handle = tokio::spawn(async move {
            whale_for_poll.run(exchange_for_poll.as_ref()).await;
        });

        let risk_for_events = risk_manager.clone();
        let events_handle = tokio::spawn(async move {
            loop {
                let event = rx.recv().await;
                risk_for_events.on_trade_event(event).await;
            }
        });

        let risk_for_scan = risk_manager.clone();
        let scan_handle = tokio::spawn(async move {
            risk_for_scan.monitor_risks().await;
        });

        let risk_for_log = risk_manager.clone();
        let log_handle = tokio::spawn(async move {
            risk_for_log.monitor_portfolio_logging().await;
        });

        let cache_for_ws = cache.clone();
        let ws_handle = tokio::spawn(async move {
            stream.run(initial_tokens, &cache_for_ws).await;
        });

        let config_handle = tokio::spawn(watch_config(config_path, risk_manager.clone(), whale_monitor.clone(), ai.clone()));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
            }
            result = poll_handle => {
                log_task_exit("whale poll loop", result);
            }
            result = events_handle => {
                log_task_exit("trade event consumer", result);
            }
            result = scan_handle => {
                log_task_exit("risk scan loop", result);
            }
            result = log_handle => {
                log_task_exit("portfolio logging loop", result);
            }
            result = ws_handle => {
                log_task_exit("order book websocket", result);
            }
            result = config_handle => {
                log_task_exit("config watcher", result);
            }
        }

        exchange.stop().await?;
        Ok(())
    }
}

fn log_task_exit(name: &str, result: std::result::Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => warn!(task = name, "background task exited unexpectedly"),
        Err(e) => error!(task = name, error = %e, "background task panicked"),
    }
}

/// Re-reads `strategies.toml` every [`CONFIG_WATCH_INTERVAL`] and, on a
/// changed mtime, re-validates and dispatches the new risk config and whale
/// targets. A parse/validation failure is logged and the prior config stays
/// in effect until the next tick.
async fn watch_config(
    path: std::path::PathBuf,
    risk: Arc<PortfolioRiskManager>,
    whale: Arc<WhaleMonitor>,
    ai: Arc<AiAnalysisService>,
) {
    let mut last_modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();

    loop {
        tokio::time::sleep(CONFIG_WATCH_INTERVAL).await;

        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(target: "config", error = %e, "failed to stat strategy file");
                continue;
            }
        };
        if Some(modified) == last_modified {
            continue;
        }

        match AppConfig::load(&path) {
            Ok(config) => {
                config.apply_to_ai(&ai);
                risk.update_config(config.risk);
                whale.set_targets(config.targets);
                last_modified = Some(modified);
                info!(target: "config", "strategy file reloaded");
            }
            Err(e) => {
                warn!(target: "config", error = %e, "failed to reload strategy file, keeping prior config");
            }
        }
    }
}
