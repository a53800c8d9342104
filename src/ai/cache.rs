//! Per-token AI decision cache and request-count state, persisted to
//! `ai_analysis_cache.json` / `ai_state.json`.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::TokenId;
use crate::domain::TradeAnalysis;
use crate::persistence;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, TradeAnalysis>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateFile {
    requests_made: u64,
}

/// Caches one [`TradeAnalysis`] per token so a second trade on the same token
/// doesn't re-spend an AI request, and tracks how many requests have been made
/// against the configured budget.
pub struct AiCache {
    cache: RwLock<CacheFile>,
    state: RwLock<StateFile>,
    cache_path: PathBuf,
    state_path: PathBuf,
}

impl AiCache {
    pub fn load(cache_path: PathBuf, state_path: PathBuf) -> Self {
        let cache = persistence::load_json(&cache_path).unwrap_or_default();
        let state = persistence::load_json(&state_path).unwrap_or_default();
        Self {
            cache: RwLock::new(cache),
            state: RwLock::new(state),
            cache_path,
            state_path,
        }
    }

    #[must_use]
    pub fn get(&self, token_id: &TokenId) -> Option<TradeAnalysis> {
        self.cache.read().entries.get(token_id.as_str()).cloned()
    }

    pub fn put(&self, token_id: &TokenId, analysis: TradeAnalysis) {
        self.cache.write().entries.insert(token_id.as_str().to_string(), analysis);
        self.persist_cache();
    }

    #[must_use]
    pub fn requests_made(&self) -> u64 {
        self.state.read().requests_made
    }

    pub fn record_request(&self) {
        self.state.write().requests_made += 1;
        self.persist_state();
    }

    fn persist_cache(&self) {
        if let Err(e) = persistence::save_json(&self.cache_path, &*self.cache.read()) {
            tracing::warn!(target: "ai", error = %e, "failed to persist AI analysis cache");
        }
    }

    fn persist_state(&self) {
        if let Err(e) = persistence::save_json(&self.state_path, &*self.state.read()) {
            tracing::warn!(target: "ai", error = %e, "failed to persist AI state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> AiCache {
        let dir = tempfile::tempdir().unwrap();
        AiCache::load(
            dir.path().join("ai_analysis_cache.json"),
            dir.path().join("ai_state.json"),
        )
    }

    #[test]
    fn put_then_get_roundtrips() {
        let cache = cache();
        let token = TokenId::new("t1");
        cache.put(&token, TradeAnalysis::blocked("test"));
        assert!(cache.get(&token).is_some());
    }

    #[test]
    fn miss_returns_none() {
        let cache = cache();
        assert!(cache.get(&TokenId::new("nope")).is_none());
    }

    #[test]
    fn record_request_increments_counter() {
        let cache = cache();
        assert_eq!(cache.requests_made(), 0);
        cache.record_request();
        cache.record_request();
        assert_eq!(cache.requests_made(), 2);
    }
}
