//! Orchestrates the AI analysis gate: cache lookup, request budget, circuit
//! breaker, rate limiting, and the analyzer call itself.
//!
//! Every failure path here converges on [`TradeAnalysis::blocked`] — a rate
//! limiter timeout, a budget exhaustion, an open circuit, or an analyzer
//! error all produce a verdict that refuses the trade. There is no fallback
//! that waves a trade through when analysis couldn't be completed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain::{MarketMetadata, SportsSelectivityResult, TokenId, TradeAnalysis};

use super::analyzer::{Analyzer, TradeContext};
use super::cache::AiCache;
use super::rate_limiter::{AiRateLimiter, RateLimiterConfig};

/// How many consecutive analyzer failures trip the circuit breaker, by default.
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// How long the breaker stays open before allowing another attempt, by default.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    threshold: AtomicU32,
    cooldown: Mutex<Duration>,
    open_until: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            threshold: AtomicU32::new(DEFAULT_FAILURE_THRESHOLD),
            cooldown: Mutex::new(DEFAULT_COOLDOWN),
            open_until: Mutex::new(None),
        }
    }

    fn is_open(&self) -> bool {
        match *self.open_until.lock() {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                *self.open_until.lock() = None;
                self.consecutive_failures.store(0, Ordering::Relaxed);
                false
            }
            None => false,
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        let threshold = self.threshold.load(Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= threshold {
            let cooldown = *self.cooldown.lock();
            *self.open_until.lock() = Some(Instant::now() + cooldown);
            warn!(target: "ai", failures, "circuit breaker opened after consecutive analyzer failures");
        }
    }

    fn update_config(&self, threshold: Option<u32>, cooldown: Option<Duration>) {
        if let Some(threshold) = threshold {
            self.threshold.store(threshold, Ordering::Relaxed);
        }
        if let Some(cooldown) = cooldown {
            *self.cooldown.lock() = cooldown;
        }
    }
}

/// Live-reloadable policy for [`AiAnalysisService::check_sports_filter`].
#[derive(Debug, Clone, Copy)]
pub struct SportsFilterConfig {
    pub enabled: bool,
    pub allow_selective_trades: bool,
    pub max_days_to_resolution: f64,
    pub min_favorite_odds: f64,
}

impl Default for SportsFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_selective_trades: false,
            max_days_to_resolution: 4.0,
            min_favorite_odds: 0.70,
        }
    }
}

/// Caps how many analysis requests we'll make in total before refusing new
/// trades outright (protects the operator's AI provider bill).
pub struct AiAnalysisService {
    analyzer: Box<dyn Analyzer>,
    rate_limiter: AiRateLimiter,
    cache: AiCache,
    breaker: CircuitBreaker,
    max_requests: AtomicU64,
    sports_filter: RwLock<SportsFilterConfig>,
    sports_cache: Mutex<HashMap<TokenId, bool>>,
    crypto_enabled: AtomicBool,
}

impl AiAnalysisService {
    pub fn new(
        analyzer: Box<dyn Analyzer>,
        rate_limiter: AiRateLimiter,
        cache_path: PathBuf,
        state_path: PathBuf,
        max_requests: u64,
    ) -> Self {
        Self {
            analyzer,
            rate_limiter,
            cache: AiCache::load(cache_path, state_path),
            breaker: CircuitBreaker::new(),
            max_requests: AtomicU64::new(max_requests),
            sports_filter: RwLock::new(SportsFilterConfig::default()),
            sports_cache: Mutex::new(HashMap::new()),
            crypto_enabled: AtomicBool::new(false),
        }
    }

    pub fn set_max_requests(&self, max_requests: u64) {
        self.max_requests.store(max_requests, Ordering::Relaxed);
    }

    /// Replace the sports filter policy wholesale, as dispatched by the
    /// config hot-reload task.
    pub fn update_sports_filter_config(
        &self,
        enabled: bool,
        allow_selective_trades: bool,
        max_days_to_resolution: f64,
        min_favorite_odds: f64,
    ) {
        *self.sports_filter.write() = SportsFilterConfig {
            enabled,
            allow_selective_trades,
            max_days_to_resolution,
            min_favorite_odds,
        };
    }

    /// Toggle whether [`Self::is_crypto_price_market`] consults the analyzer
    /// at all. When disabled, every market classifies as non-crypto.
    pub fn update_crypto_market_config(&self, enabled: bool) {
        self.crypto_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Rebuild the rate limiter's tunables from the current config, with any
    /// `Some` field overriding it.
    pub fn update_rate_limit_config(
        &self,
        requests_per_second: Option<f64>,
        max_concurrent: Option<usize>,
        queue_timeout: Option<Duration>,
    ) {
        let current = self.rate_limiter.config();
        let updated = RateLimiterConfig::new(
            requests_per_second.unwrap_or(current.requests_per_second),
            max_concurrent.unwrap_or(current.max_concurrent),
            queue_timeout.unwrap_or(current.queue_timeout),
        );
        self.rate_limiter.update_config(updated);
    }

    pub fn update_circuit_breaker_config(&self, threshold: Option<u32>, cooldown: Option<Duration>) {
        self.breaker.update_config(threshold, cooldown);
    }

    /// The core decision gate. Cached verdicts are reused without spending a
    /// request; anything else goes through the budget check, the circuit
    /// breaker, the rate limiter, and finally the analyzer.
    pub async fn should_execute_trade(&self, context: &TradeContext, token_id: &crate::domain::TokenId) -> TradeAnalysis {
        if let Some(cached) = self.cache.get(token_id) {
            info!(target: "ai", token_id = %token_id, "using cached analysis");
            return cached;
        }

        if self.cache.requests_made() >= self.max_requests.load(Ordering::Relaxed) {
            warn!(target: "ai", "AI request budget exhausted, blocking trade");
            return TradeAnalysis::blocked("AI request budget exhausted");
        }

        if self.breaker.is_open() {
            warn!(target: "ai", "circuit breaker open, blocking trade");
            return TradeAnalysis::blocked("AI circuit breaker open after repeated failures");
        }

        let Some(_permit) = self.rate_limiter.acquire().await else {
            warn!(target: "ai", "rate limiter queue timed out, blocking trade");
            return TradeAnalysis::blocked("AI rate limiter queue timed out");
        };

        self.cache.record_request();
        let analysis = match self.analyzer.analyze_trade(context).await {
            Ok(analysis) => {
                self.breaker.record_success();
                analysis
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(target: "ai", error = %e, "analyzer call failed, blocking trade");
                TradeAnalysis::blocked(format!("analyzer error: {e}"))
            }
        };

        self.log_analysis(context, &analysis);
        self.cache.put(token_id, analysis.clone());
        analysis
    }

    fn log_analysis(&self, context: &TradeContext, analysis: &TradeAnalysis) {
        let tag = if analysis.should_trade { "✅ APPROVE" } else { "🚫 REJECT" };
        info!(
            target: "ai",
            whale = %context.whale_name,
            confidence_pct = analysis.confidence * 100.0,
            justification = %analysis.justification,
            risk_factors = ?analysis.risk_factors,
            opportunity_factors = ?analysis.opportunity_factors,
            resolution_time = ?analysis.estimated_resolution_time,
            subjectivity = analysis.subjectivity_label(),
            "{tag} trade analysis"
        );
    }

    /// Full sports-filter decision: disabled never blocks; enabled and not a
    /// sports market never blocks; enabled, sports, and selective mode off
    /// always blocks; enabled, sports, and selective mode on defers to
    /// [`Analyzer::evaluate_sports_selectivity`] and blocks unless it qualifies.
    /// Returns `(blocked, reason)`.
    pub async fn check_sports_filter(
        &self,
        token_id: &TokenId,
        metadata: &MarketMetadata,
        context: &TradeContext,
    ) -> (bool, String) {
        let config = *self.sports_filter.read();
        if !config.enabled {
            return (false, "sports filter disabled".to_string());
        }

        let is_sports = if let Some(cached) = self.sports_cache.lock().get(token_id).copied() {
            cached
        } else {
            let classified = match self.analyzer.is_sports_market(metadata).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(target: "ai", error = %e, "sports market classification failed, treating as sports");
                    true
                }
            };
            self.sports_cache.lock().insert(token_id.clone(), classified);
            classified
        };

        if !is_sports {
            return (false, "not a sports market".to_string());
        }

        if !config.allow_selective_trades {
            return (true, "sports market, selective trades disabled".to_string());
        }

        let selectivity = self.evaluate_sports_selectivity(context).await;
        if selectivity.should_consider {
            (false, selectivity.reasoning)
        } else {
            (true, selectivity.reasoning)
        }
    }

    /// Crypto price-threshold classification. Purely classificatory: the
    /// portfolio manager uses the result to select a risk band, never to
    /// block a trade outright. Disabled by default; when disabled every
    /// market classifies as non-crypto without consulting the analyzer.
    /// Fails closed to "not crypto", leaving the default risk band in effect.
    pub async fn is_crypto_price_market(&self, metadata: &MarketMetadata) -> bool {
        if !self.crypto_enabled.load(Ordering::Relaxed) {
            return false;
        }
        match self.analyzer.is_crypto_price_market(metadata).await {
            Ok(result) => result,
            Err(e) => {
                warn!(target: "ai", error = %e, "crypto market classification failed, using default risk band");
                false
            }
        }
    }

    /// A stricter selectivity pass for sports-adjacent markets that otherwise
    /// pass the sports filter. Fails closed: analyzer failure means "don't
    /// consider it".
    async fn evaluate_sports_selectivity(&self, context: &TradeContext) -> SportsSelectivityResult {
        match self.analyzer.evaluate_sports_selectivity(context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(target: "ai", error = %e, "sports selectivity evaluation failed, excluding market");
                SportsSelectivityResult {
                    should_consider: false,
                    reasoning: format!("evaluation failed: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TokenId;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    struct ScriptedAnalyzer {
        calls: AtomicUsize,
        fail: bool,
        is_sports: bool,
        is_crypto: bool,
    }

    impl ScriptedAnalyzer {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail, is_sports: false, is_crypto: false }
        }
    }

    #[async_trait]
    impl Analyzer for ScriptedAnalyzer {
        async fn analyze_trade(&self, _context: &TradeContext) -> crate::error::Result<TradeAnalysis> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(crate::error::Error::Timeout(StdDuration::from_secs(1)));
            }
            Ok(TradeAnalysis {
                should_trade: true,
                confidence: 0.9,
                justification: "looks fine".to_string(),
                risk_factors: vec![],
                opportunity_factors: vec![],
                estimated_resolution_time: None,
                subjectivity_score: Some(0.1),
            })
        }

        async fn is_sports_market(&self, _metadata: &MarketMetadata) -> crate::error::Result<bool> {
            Ok(self.is_sports)
        }

        async fn evaluate_sports_selectivity(&self, _context: &TradeContext) -> crate::error::Result<SportsSelectivityResult> {
            Ok(SportsSelectivityResult { should_consider: true, reasoning: "ok".to_string() })
        }

        async fn is_crypto_price_market(&self, _metadata: &MarketMetadata) -> crate::error::Result<bool> {
            Ok(self.is_crypto)
        }
    }

    fn context() -> TradeContext {
        TradeContext {
            whale_name: "Whale1".to_string(),
            whale_address: "0xabc".to_string(),
            trade_size_usd: dec!(100),
            outcome: Some("Yes".to_string()),
            market_slug: Some("slug".to_string()),
            trade_side: "BUY".to_string(),
            timestamp: 1700000000,
        }
    }

    fn metadata() -> MarketMetadata {
        MarketMetadata {
            title: "title".to_string(),
            question: "question".to_string(),
            group_name: None,
            category: None,
            status: None,
            volume: None,
            end_date: None,
            outcomes: None,
            score: None,
        }
    }

    fn service_with(analyzer: ScriptedAnalyzer, max_requests: u64) -> AiAnalysisService {
        let dir = tempfile::tempdir().unwrap();
        let rate_limiter = AiRateLimiter::new(RateLimiterConfig::new(100.0, 10, Duration::from_secs(5)));
        AiAnalysisService::new(
            Box::new(analyzer),
            rate_limiter,
            dir.path().join("cache.json"),
            dir.path().join("state.json"),
            max_requests,
        )
    }

    fn service(fail: bool, max_requests: u64) -> AiAnalysisService {
        service_with(ScriptedAnalyzer::new(fail), max_requests)
    }

    #[tokio::test]
    async fn approves_and_caches_successful_analysis() {
        let service = service(false, 10);
        let token = TokenId::new("t1");
        let result = service.should_execute_trade(&context(), &token).await;
        assert!(result.should_trade);

        // second call should hit the cache, not the analyzer again.
        let second = service.should_execute_trade(&context(), &token).await;
        assert!(second.should_trade);
        assert_eq!(service.cache.requests_made(), 1);
    }

    #[tokio::test]
    async fn analyzer_failure_blocks_the_trade() {
        let service = service(true, 10);
        let result = service.should_execute_trade(&context(), &TokenId::new("t1")).await;
        assert!(!result.should_trade);
    }

    #[tokio::test]
    async fn exhausted_budget_blocks_without_calling_analyzer() {
        let service = service(false, 0);
        let result = service.should_execute_trade(&context(), &TokenId::new("t1")).await;
        assert!(!result.should_trade);
        assert_eq!(service.cache.requests_made(), 0);
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_repeated_failures() {
        let service = service(true, 100);
        for i in 0..DEFAULT_FAILURE_THRESHOLD {
            let token = TokenId::new(format!("t{i}"));
            service.should_execute_trade(&context(), &token).await;
        }
        assert!(service.breaker.is_open());
        let blocked = service.should_execute_trade(&context(), &TokenId::new("tx")).await;
        assert!(!blocked.should_trade);
    }

    #[tokio::test]
    async fn circuit_breaker_config_lowers_threshold() {
        let service = service(true, 100);
        service.update_circuit_breaker_config(Some(2), None);
        for i in 0..2 {
            let token = TokenId::new(format!("u{i}"));
            service.should_execute_trade(&context(), &token).await;
        }
        assert!(service.breaker.is_open());
    }

    #[tokio::test]
    async fn sports_filter_disabled_never_blocks() {
        let mut analyzer = ScriptedAnalyzer::new(false);
        analyzer.is_sports = true;
        let service = service_with(analyzer, 10);
        let (blocked, _) = service.check_sports_filter(&TokenId::new("t1"), &metadata(), &context()).await;
        assert!(!blocked);
    }

    #[tokio::test]
    async fn sports_filter_blocks_non_selective_sports_market() {
        let mut analyzer = ScriptedAnalyzer::new(false);
        analyzer.is_sports = true;
        let service = service_with(analyzer, 10);
        service.update_sports_filter_config(true, false, 4.0, 0.70);
        let (blocked, _) = service.check_sports_filter(&TokenId::new("t1"), &metadata(), &context()).await;
        assert!(blocked);
    }

    #[tokio::test]
    async fn sports_filter_allows_qualifying_selective_market() {
        let mut analyzer = ScriptedAnalyzer::new(false);
        analyzer.is_sports = true;
        let service = service_with(analyzer, 10);
        service.update_sports_filter_config(true, true, 4.0, 0.70);
        let (blocked, _) = service.check_sports_filter(&TokenId::new("t1"), &metadata(), &context()).await;
        assert!(!blocked);
    }

    #[tokio::test]
    async fn sports_filter_passes_non_sports_market() {
        let service = service_with(ScriptedAnalyzer::new(false), 10);
        service.update_sports_filter_config(true, false, 4.0, 0.70);
        let (blocked, _) = service.check_sports_filter(&TokenId::new("t1"), &metadata(), &context()).await;
        assert!(!blocked);
    }

    #[tokio::test]
    async fn crypto_classification_disabled_by_default() {
        let mut analyzer = ScriptedAnalyzer::new(false);
        analyzer.is_crypto = true;
        let service = service_with(analyzer, 10);
        assert!(!service.is_crypto_price_market(&metadata()).await);
    }

    #[tokio::test]
    async fn crypto_classification_enabled_consults_analyzer() {
        let mut analyzer = ScriptedAnalyzer::new(false);
        analyzer.is_crypto = true;
        let service = service_with(analyzer, 10);
        service.update_crypto_market_config(true);
        assert!(service.is_crypto_price_market(&metadata()).await);
    }
}
