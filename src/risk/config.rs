//! Tunable risk and budget parameters, hot-reloadable from `strategies.toml`.

use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::TokenId;

/// Stop-loss/take-profit thresholds and hold bands selected for one risk-scan
/// check, after crypto-market rule selection has already happened.
#[derive(Debug, Clone, Copy)]
pub struct RiskBand {
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_hold_min_price: Decimal,
    pub take_profit_hold_min_price: Decimal,
}

/// A narrower stop-loss/take-profit band applied to markets the AI gate
/// classifies as crypto price-threshold markets, e.g. "will BTC be above $X".
/// Selection is purely classificatory (see [`crate::ai::AiAnalysisService`]);
/// this struct only carries the thresholds, not the decision of whether to use them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoMarketRules {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_crypto_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    #[serde(default = "default_crypto_take_profit_pct")]
    pub take_profit_pct: Decimal,
    #[serde(default = "default_crypto_hold_min_price")]
    pub take_profit_hold_min_price: Decimal,
    #[serde(default = "default_crypto_hold_min_price")]
    pub stop_loss_hold_min_price: Decimal,
}

fn default_crypto_stop_loss_pct() -> Decimal {
    dec!(0.20)
}
fn default_crypto_take_profit_pct() -> Decimal {
    dec!(0.45)
}
fn default_crypto_hold_min_price() -> Decimal {
    dec!(0.75)
}

impl Default for CryptoMarketRules {
    fn default() -> Self {
        Self {
            enabled: false,
            stop_loss_pct: default_crypto_stop_loss_pct(),
            take_profit_pct: default_crypto_take_profit_pct(),
            take_profit_hold_min_price: default_crypto_hold_min_price(),
            stop_loss_hold_min_price: default_crypto_hold_min_price(),
        }
    }
}

/// Risk and budget parameters the portfolio manager enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// ROI at or below which an open position is stopped out, e.g. `-0.20`
    /// for a 20% drawdown trigger.
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// ROI at or above which half the position is taken off the table.
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    /// Take-profit does not fire while `market_price >= this` (0 disables the
    /// hold band). Lets a winning position ride while price is still climbing.
    #[serde(default)]
    pub take_profit_hold_min_price: Decimal,
    /// Stop-loss does not fire while `market_price >= this` (0 disables the
    /// hold band).
    #[serde(default)]
    pub stop_loss_hold_min_price: Decimal,
    /// Narrower stop-loss/take-profit band applied to crypto price-threshold
    /// markets instead of the defaults above.
    #[serde(default)]
    pub crypto_market_rules: CryptoMarketRules,
    /// Never mirror a BUY priced below this.
    #[serde(default = "default_min_share_price")]
    pub min_share_price: Decimal,
    #[serde(default = "default_log_interval_minutes")]
    pub log_interval_minutes: u64,
    /// Cumulative spend ceiling across all managed positions.
    #[serde(default = "default_max_budget")]
    pub max_budget: Decimal,
    /// Positions valued below this are ignored by the risk scan (dust).
    #[serde(default = "default_min_position_value")]
    pub min_position_value: Decimal,
    #[serde(default = "default_risk_check_interval_seconds")]
    pub risk_check_interval_seconds: u64,
    /// An AI rejection at or above this confidence opens a manual override
    /// window instead of being treated as noise and auto-proceeding.
    #[serde(default = "default_ai_min_confidence")]
    pub ai_min_confidence: f64,
    #[serde(default)]
    pub blacklisted_tokens: HashSet<TokenId>,
}

fn default_stop_loss_pct() -> Decimal {
    dec!(0.20)
}
fn default_take_profit_pct() -> Decimal {
    dec!(0.9)
}
fn default_min_share_price() -> Decimal {
    dec!(0.19)
}
fn default_log_interval_minutes() -> u64 {
    60
}
fn default_max_budget() -> Decimal {
    dec!(100.0)
}
fn default_min_position_value() -> Decimal {
    dec!(0.03)
}
fn default_risk_check_interval_seconds() -> u64 {
    10
}
fn default_ai_min_confidence() -> f64 {
    0.7
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            take_profit_hold_min_price: Decimal::ZERO,
            stop_loss_hold_min_price: Decimal::ZERO,
            crypto_market_rules: CryptoMarketRules::default(),
            min_share_price: default_min_share_price(),
            log_interval_minutes: default_log_interval_minutes(),
            max_budget: default_max_budget(),
            min_position_value: default_min_position_value(),
            risk_check_interval_seconds: default_risk_check_interval_seconds(),
            ai_min_confidence: default_ai_min_confidence(),
            blacklisted_tokens: HashSet::new(),
        }
    }
}

impl RiskConfig {
    #[must_use]
    pub fn is_blacklisted(&self, token_id: &TokenId) -> bool {
        self.blacklisted_tokens.contains(token_id)
    }

    /// Select the stop-loss/take-profit band to apply: the crypto band when
    /// crypto rules are enabled and the position was classified as crypto,
    /// the default band otherwise.
    #[must_use]
    pub fn risk_band(&self, is_crypto: bool) -> RiskBand {
        if is_crypto && self.crypto_market_rules.enabled {
            RiskBand {
                stop_loss_pct: self.crypto_market_rules.stop_loss_pct,
                take_profit_pct: self.crypto_market_rules.take_profit_pct,
                stop_loss_hold_min_price: self.crypto_market_rules.stop_loss_hold_min_price,
                take_profit_hold_min_price: self.crypto_market_rules.take_profit_hold_min_price,
            }
        } else {
            RiskBand {
                stop_loss_pct: self.stop_loss_pct,
                take_profit_pct: self.take_profit_pct,
                stop_loss_hold_min_price: self.stop_loss_hold_min_price,
                take_profit_hold_min_price: self.take_profit_hold_min_price,
            }
        }
    }
}
