//! Whale targets and the trade events the activity monitor emits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{TokenId, WalletAddress};
use super::order::Side;

/// How we react to a watched wallet's activity.
///
/// Only [`StrategyType::Mirror`] is currently acted on by the risk manager; the
/// monitor still tags every target with a strategy so a future inverse-copy mode
/// doesn't require a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyType {
    Mirror,
    Inverse,
}

impl Default for StrategyType {
    fn default() -> Self {
        Self::Mirror
    }
}

/// A whale wallet we're watching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTarget {
    pub address: WalletAddress,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub strategy_type: StrategyType,
    #[serde(default)]
    pub max_copy_amount: Option<Decimal>,
}

fn default_name() -> String {
    "Unknown".to_string()
}

impl WalletTarget {
    #[must_use]
    pub fn new(address: WalletAddress) -> Self {
        Self {
            address,
            name: default_name(),
            strategy_type: StrategyType::Mirror,
            max_copy_amount: None,
        }
    }
}

/// A single observed trade by a watched wallet, emitted by the whale activity
/// monitor and consumed by the portfolio risk manager's decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub source_wallet_name: String,
    pub source_wallet_address: WalletAddress,
    pub token_id: TokenId,
    pub market_slug: Option<String>,
    pub outcome: Option<String>,
    pub side: Side,
    pub usd_size: Decimal,
    /// Unix timestamp (seconds) as reported by the activity endpoint.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_target_defaults_to_mirror_and_unknown_name() {
        let t = WalletTarget::new(WalletAddress::new("0xabc"));
        assert_eq!(t.name, "Unknown");
        assert_eq!(t.strategy_type, StrategyType::Mirror);
        assert!(t.max_copy_amount.is_none());
    }
}
