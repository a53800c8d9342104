//! End-to-end exercises of the decision pipeline against the mock exchange
//! and a scripted AI analyzer: no network, no live CLOB.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use whalecopy::ai::{AiAnalysisService, AiRateLimiter, Analyzer, RateLimiterConfig, TradeContext};
use whalecopy::domain::{MarketMetadata, Side, SportsSelectivityResult, TokenId, TradeAnalysis, TradeEvent, WalletAddress};
use whalecopy::error::Result;
use whalecopy::exchange::{ExchangeProvider, MockExchangeProvider};
use whalecopy::risk::{PortfolioRiskManager, RiskConfig};

struct ScriptedAnalyzer {
    should_trade: bool,
    confidence: f64,
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyze_trade(&self, _context: &TradeContext) -> Result<TradeAnalysis> {
        Ok(TradeAnalysis {
            should_trade: self.should_trade,
            confidence: self.confidence,
            justification: "scripted".to_string(),
            risk_factors: vec![],
            opportunity_factors: vec![],
            estimated_resolution_time: None,
            subjectivity_score: Some(0.2),
        })
    }
    async fn is_sports_market(&self, _metadata: &MarketMetadata) -> Result<bool> {
        Ok(false)
    }
    async fn evaluate_sports_selectivity(&self, _context: &TradeContext) -> Result<SportsSelectivityResult> {
        Ok(SportsSelectivityResult { should_consider: true, reasoning: "scripted".into() })
    }
    async fn is_crypto_price_market(&self, _metadata: &MarketMetadata) -> Result<bool> {
        Ok(false)
    }
}

fn build_manager(analyzer: ScriptedAnalyzer, risk: RiskConfig) -> (tempfile::TempDir, PortfolioRiskManager, Arc<dyn ExchangeProvider>) {
    let dir = tempfile::tempdir().unwrap();
    let exchange: Arc<dyn ExchangeProvider> = Arc::new(MockExchangeProvider::new(dir.path().join("mock.json")));
    let rate_limiter = AiRateLimiter::new(RateLimiterConfig::new(100.0, 10, Duration::from_secs(5)));
    let ai = Arc::new(AiAnalysisService::new(
        Box::new(analyzer),
        rate_limiter,
        dir.path().join("ai_cache.json"),
        dir.path().join("ai_state.json"),
        1000,
    ));
    let manager = PortfolioRiskManager::new(
        exchange.clone(),
        ai,
        risk,
        dir.path().join("bot_state.json"),
        dir.path().join("trades.jsonl"),
        dir.path().join("override"),
    );
    (dir, manager, exchange)
}

fn buy_event(token: &str) -> TradeEvent {
    TradeEvent {
        source_wallet_name: "whale".to_string(),
        source_wallet_address: WalletAddress::new("0xwhale"),
        token_id: TokenId::new(token),
        market_slug: Some("some-market".to_string()),
        outcome: Some("Yes".to_string()),
        side: Side::Buy,
        usd_size: dec!(500),
        timestamp: 1_700_000_000,
    }
}

#[tokio::test]
async fn approved_buy_mirrors_against_the_book() {
    let (_dir, manager, exchange) = build_manager(ScriptedAnalyzer { should_trade: true, confidence: 0.9 }, RiskConfig::default());

    manager.on_trade_event(buy_event("tok-1")).await;

    let positions = exchange.get_positions().await.unwrap();
    assert_eq!(positions.len(), 1);
    assert!(positions[0].size > rust_decimal::Decimal::ZERO);
}

#[tokio::test]
async fn low_confidence_rejection_auto_proceeds() {
    // Below the default ai_min_confidence threshold: treated as noise.
    let (_dir, manager, exchange) = build_manager(ScriptedAnalyzer { should_trade: false, confidence: 0.1 }, RiskConfig::default());

    manager.on_trade_event(buy_event("tok-2")).await;

    let positions = exchange.get_positions().await.unwrap();
    assert_eq!(positions.len(), 1);
}

#[tokio::test]
async fn high_confidence_rejection_blocks_without_manual_approval() {
    let (_dir, manager, exchange) = build_manager(ScriptedAnalyzer { should_trade: false, confidence: 0.95 }, RiskConfig::default());

    manager.on_trade_event(buy_event("tok-3")).await;

    let positions = exchange.get_positions().await.unwrap();
    assert!(positions.is_empty());
}

#[tokio::test]
async fn blacklisted_token_never_reaches_the_ai_gate() {
    let mut risk = RiskConfig::default();
    risk.blacklisted_tokens.insert(TokenId::new("tok-4"));
    let (_dir, manager, exchange) = build_manager(ScriptedAnalyzer { should_trade: true, confidence: 0.9 }, risk);

    manager.on_trade_event(buy_event("tok-4")).await;

    assert!(exchange.get_positions().await.unwrap().is_empty());
}

#[tokio::test]
async fn price_below_minimum_skips_the_mirror() {
    let mut risk = RiskConfig::default();
    // The mock exchange's dummy book asks at 0.51; raise the floor above it.
    risk.min_share_price = dec!(0.99);
    let (_dir, manager, exchange) = build_manager(ScriptedAnalyzer { should_trade: true, confidence: 0.9 }, risk);

    manager.on_trade_event(buy_event("tok-5")).await;

    assert!(exchange.get_positions().await.unwrap().is_empty());
}

#[tokio::test]
async fn budget_exceeded_skips_the_mirror() {
    let mut risk = RiskConfig::default();
    risk.max_budget = dec!(0.01);
    let (_dir, manager, exchange) = build_manager(ScriptedAnalyzer { should_trade: true, confidence: 0.9 }, risk);

    manager.on_trade_event(buy_event("tok-6")).await;

    assert!(exchange.get_positions().await.unwrap().is_empty());
}
