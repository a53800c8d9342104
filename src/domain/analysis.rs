//! AI decision outputs: the trade gate verdict and the sports-market selectivity
//! check.

use serde::{Deserialize, Serialize};

/// Verdict returned by [`crate::ai::AiAnalysisService::should_execute_trade`].
///
/// `should_trade = false` is the safe default: any failure inside the service
/// (rate limiter timeout, analyzer error, cache corruption) converts to a blocking
/// analysis rather than one that waves the trade through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAnalysis {
    pub should_trade: bool,
    /// 0.0-1.0, how confident the model is in its verdict.
    pub confidence: f64,
    pub justification: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub opportunity_factors: Vec<String>,
    #[serde(default)]
    pub estimated_resolution_time: Option<String>,
    /// 0.0 (purely mechanical/objective market) to 1.0 (highly subjective outcome).
    #[serde(default)]
    pub subjectivity_score: Option<f64>,
}

impl TradeAnalysis {
    /// The blocking verdict used whenever analysis can't be completed safely:
    /// rate limiter timeout, analyzer HTTP failure, or an open circuit breaker.
    #[must_use]
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            should_trade: false,
            confidence: 0.0,
            justification: reason.into(),
            risk_factors: Vec::new(),
            opportunity_factors: Vec::new(),
            estimated_resolution_time: None,
            subjectivity_score: None,
        }
    }

    /// Human label for `subjectivity_score`, used only in log lines.
    #[must_use]
    pub fn subjectivity_label(&self) -> &'static str {
        match self.subjectivity_score {
            Some(s) if s >= 0.66 => "highly subjective",
            Some(s) if s >= 0.33 => "moderately subjective",
            Some(_) => "mostly objective",
            None => "unknown",
        }
    }
}

/// Verdict for whether a sports market should be traded at all, distinct from
/// the general per-trade analysis: sports markets are gated by a separate,
/// stricter selectivity pass before they ever reach [`TradeAnalysis`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportsSelectivityResult {
    pub should_consider: bool,
    pub reasoning: String,
}
