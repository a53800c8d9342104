//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file (`strategies.toml`) with
//! environment variable overrides for secrets: `WALLET_PRIVATE_KEY`,
//! `ANTHROPIC_API_KEY`/`GEMINI_API_KEY`, `DATABASE_URL`. None of these are
//! ever read from the file itself.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::ai::AiAnalysisService;
use crate::domain::{TokenId, WalletTarget};
use crate::error::{ConfigError, Result};
use crate::exchange::polymarket::PolymarketConfig;
use crate::risk::RiskConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Anthropic,
    Gemini,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub provider: AiProvider,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_queue_timeout_secs")]
    pub queue_timeout_secs: f64,
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    #[serde(default = "default_circuit_breaker_cooldown_secs")]
    pub circuit_breaker_cooldown_secs: u64,
}

fn default_ai_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}
fn default_max_requests() -> u64 {
    500
}
fn default_requests_per_second() -> f64 {
    5.0
}
fn default_max_concurrent() -> usize {
    10
}
fn default_queue_timeout_secs() -> f64 {
    120.0
}
fn default_circuit_breaker_threshold() -> u32 {
    5
}
fn default_circuit_breaker_cooldown_secs() -> u64 {
    60
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            model: default_ai_model(),
            max_requests: default_max_requests(),
            requests_per_second: default_requests_per_second(),
            max_concurrent: default_max_concurrent(),
            queue_timeout_secs: default_queue_timeout_secs(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_cooldown_secs: default_circuit_breaker_cooldown_secs(),
        }
    }
}

/// Sports-market exclusion policy, polled from `strategies.toml` and
/// dispatched to [`crate::ai::AiAnalysisService::update_sports_filter_config`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SportsFilterSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allow_selective_trades: bool,
    #[serde(default)]
    pub selective_criteria: SelectiveCriteria,
}

impl Default for SportsFilterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_selective_trades: false,
            selective_criteria: SelectiveCriteria::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SelectiveCriteria {
    #[serde(default = "default_max_days_to_resolution")]
    pub max_days_to_resolution: f64,
    #[serde(default = "default_min_favorite_odds")]
    pub min_favorite_odds: f64,
}

fn default_max_days_to_resolution() -> f64 {
    4.0
}
fn default_min_favorite_odds() -> f64 {
    0.70
}

impl Default for SelectiveCriteria {
    fn default() -> Self {
        Self {
            max_days_to_resolution: default_max_days_to_resolution(),
            min_favorite_odds: default_min_favorite_odds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub ws_url: String,
    pub activity_api: String,
    pub positions_api: String,
    pub gamma_api: String,
    pub clob_api: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    137
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://ws-subscriptions-clob.polymarket.com/ws/market".into(),
            activity_api: "https://data-api.polymarket.com/activity".into(),
            positions_api: "https://data-api.polymarket.com/positions".into(),
            gamma_api: "https://gamma-api.polymarket.com".into(),
            clob_api: "https://clob.polymarket.com".into(),
            chain_id: default_chain_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Paths for persisted state, kept under one directory so the whole
/// installation can be backed up or wiped by removing it.
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./state")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { dir: default_state_dir() }
    }
}

impl StateConfig {
    #[must_use]
    pub fn bot_state_path(&self) -> PathBuf {
        self.dir.join("bot_state.json")
    }
    #[must_use]
    pub fn trade_log_path(&self) -> PathBuf {
        self.dir.join("trades.jsonl")
    }
    #[must_use]
    pub fn ai_cache_path(&self) -> PathBuf {
        self.dir.join("ai_cache.json")
    }
    #[must_use]
    pub fn ai_request_state_path(&self) -> PathBuf {
        self.dir.join("ai_requests.json")
    }
    #[must_use]
    pub fn mock_exchange_path(&self) -> PathBuf {
        self.dir.join("mock_exchange.json")
    }
    #[must_use]
    pub fn override_dir(&self) -> PathBuf {
        self.dir.join("override")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Signing key, loaded from `WALLET_PRIVATE_KEY` at runtime. Never read
    /// from the config file.
    #[serde(skip)]
    pub private_key: Option<String>,
    /// Funder/proxy address holding the collateral, from `PROXY_ADDRESS` or
    /// `FUNDER`.
    #[serde(skip)]
    pub proxy_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Wallets whose BUYs get mirrored.
    #[serde(default)]
    pub targets: Vec<WalletTarget>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub sports_filter: SportsFilterSettings,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Route orders through the in-memory mock exchange instead of the live
    /// Polymarket CLOB.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
            state: StateConfig::default(),
            ai: AiConfig::default(),
            sports_filter: SportsFilterSettings::default(),
            risk: RiskConfig::default(),
            wallet: WalletConfig::default(),
            dry_run: false,
        }
    }
}

impl AppConfig {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        config.wallet.private_key = std::env::var("WALLET_PRIVATE_KEY").ok();
        config.wallet.proxy_address = std::env::var("PROXY_ADDRESS")
            .ok()
            .or_else(|| std::env::var("FUNDER").ok());
        if let Ok(dry_run) = std::env::var("DRY_RUN") {
            config.dry_run = dry_run == "1" || dry_run.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.network.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "network.ws_url" }.into());
        }
        if self.network.clob_api.is_empty() {
            return Err(ConfigError::MissingField { field: "network.clob_api" }.into());
        }
        if self.risk.stop_loss_pct <= rust_decimal::Decimal::ZERO || self.risk.stop_loss_pct >= rust_decimal::Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "risk.stop_loss_pct",
                reason: "must be strictly between 0 and 1".to_string(),
            }
            .into());
        }
        if self.risk.risk_check_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "risk.risk_check_interval_seconds",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    #[must_use]
    pub fn polymarket_config(&self) -> PolymarketConfig {
        PolymarketConfig {
            clob_api: self.network.clob_api.clone(),
            chain_id: self.network.chain_id,
            private_key: self.wallet.private_key.clone().unwrap_or_default(),
            proxy_address: self.wallet.proxy_address.clone(),
            positions_api: self.network.positions_api.clone(),
            gamma_api: self.network.gamma_api.clone(),
        }
    }

    /// Tokens the bot is blacklisted from or actively holds, for an initial
    /// websocket subscription list.
    #[must_use]
    pub fn blacklisted_tokens(&self) -> Vec<TokenId> {
        self.risk.blacklisted_tokens.iter().cloned().collect()
    }

    /// Push this config's AI-owned settings (sports filter, crypto
    /// classification toggle, rate limiting, circuit breaker) into a live
    /// [`AiAnalysisService`]. Called once at startup and again on every
    /// hot-reload.
    pub fn apply_to_ai(&self, ai: &AiAnalysisService) {
        ai.update_sports_filter_config(
            self.sports_filter.enabled,
            self.sports_filter.allow_selective_trades,
            self.sports_filter.selective_criteria.max_days_to_resolution,
            self.sports_filter.selective_criteria.min_favorite_odds,
        );
        ai.update_crypto_market_config(self.risk.crypto_market_rules.enabled);
        ai.update_rate_limit_config(
            Some(self.ai.requests_per_second),
            Some(self.ai.max_concurrent),
            Some(std::time::Duration::from_secs_f64(self.ai.queue_timeout_secs)),
        );
        ai.update_circuit_breaker_config(
            Some(self.ai.circuit_breaker_threshold),
            Some(std::time::Duration::from_secs(self.ai.circuit_breaker_cooldown_secs)),
        );
        ai.set_max_requests(self.ai.max_requests);
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.logging.level));
        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_parses_minimal_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strategies.toml");
        std::fs::write(&path, "[[targets]]\naddress = \"0xabc\"\nname = \"Whale\"\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].name, "Whale");
    }

    #[test]
    fn rejects_out_of_range_stop_loss() {
        let mut config = AppConfig::default();
        config.risk.stop_loss_pct = rust_decimal::Decimal::from(2);
        assert!(config.validate().is_err());
    }

    struct StubAnalyzer;

    #[async_trait::async_trait]
    impl crate::ai::Analyzer for StubAnalyzer {
        async fn analyze_trade(&self, _context: &crate::ai::TradeContext) -> crate::error::Result<crate::domain::TradeAnalysis> {
            unimplemented!()
        }
        async fn is_sports_market(&self, _metadata: &crate::domain::MarketMetadata) -> crate::error::Result<bool> {
            Ok(false)
        }
        async fn evaluate_sports_selectivity(
            &self,
            _context: &crate::ai::TradeContext,
        ) -> crate::error::Result<crate::domain::SportsSelectivityResult> {
            unimplemented!()
        }
        async fn is_crypto_price_market(&self, _metadata: &crate::domain::MarketMetadata) -> crate::error::Result<bool> {
            Ok(true)
        }
    }

    fn stub_metadata() -> crate::domain::MarketMetadata {
        crate::domain::MarketMetadata {
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

    #[tokio::test]
    async fn apply_to_ai_wires_crypto_toggle_through() {
        let dir = tempfile::tempdir().unwrap();
        let rate_limiter = crate::ai::AiRateLimiter::new(crate::ai::RateLimiterConfig::new(5.0, 10, std::time::Duration::from_secs(1)));
        let ai = AiAnalysisService::new(
            Box::new(StubAnalyzer),
            rate_limiter,
            dir.path().join("cache.json"),
            dir.path().join("state.json"),
            10,
        );

        let mut config = AppConfig::default();
        assert!(!ai.is_crypto_price_market(&stub_metadata()).await);

        config.risk.crypto_market_rules.enabled = true;
        config.apply_to_ai(&ai);
        assert!(ai.is_crypto_price_market(&stub_metadata()).await);
    }
}
