//! Market metadata as returned by the Gamma-style metadata endpoint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-facing description of the market a token belongs to.
///
/// Adapters must never propagate a metadata-fetch failure to the caller: on error
/// they return the `title = "Error Fetching Metadata"` sentinel (see
/// [`MarketMetadata::error`]) so a transient Gamma API outage degrades decisions
/// rather than crashing the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub title: String,
    pub question: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Outcome name -> current price, when the endpoint includes it.
    #[serde(default)]
    pub outcomes: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl MarketMetadata {
    /// Sentinel metadata used when a fetch fails; callers should treat this as
    /// "unknown" rather than crash the decision pipeline.
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            title: "Error Fetching Metadata".to_string(),
            question: reason.into(),
            group_name: None,
            category: None,
            status: None,
            volume: None,
            end_date: None,
            outcomes: None,
            score: None,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.title == "Error Fetching Metadata"
    }

    /// Look up the current price for a named outcome, if the endpoint reported one.
    #[must_use]
    pub fn outcome_price(&self, outcome: &str) -> Option<f64> {
        self.outcomes.as_ref().and_then(|o| o.get(outcome).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_sentinel_is_detected() {
        let meta = MarketMetadata::error("timeout");
        assert!(meta.is_error());
        assert_eq!(meta.question, "timeout");
    }

    #[test]
    fn outcome_price_looks_up_by_name() {
        let mut outcomes = HashMap::new();
        outcomes.insert("Yes".to_string(), 0.63);
        let meta = MarketMetadata {
            title: "t".into(),
            question: "q".into(),
            group_name: None,
            category: None,
            status: None,
            volume: None,
            end_date: None,
            outcomes: Some(outcomes),
            score: None,
        };
        assert_eq!(meta.outcome_price("Yes"), Some(0.63));
        assert_eq!(meta.outcome_price("No"), None);
    }
}
