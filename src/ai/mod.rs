//! AI-backed decision gate: rate limiting, caching, circuit breaking, and the
//! analyzer clients (Anthropic, Gemini) behind a common trait.

pub mod analyzer;
pub mod cache;
pub mod rate_limiter;
pub mod service;

pub use analyzer::{AnthropicAnalyzer, Analyzer, GeminiAnalyzer, TradeContext};
pub use cache::AiCache;
pub use rate_limiter::{AiRateLimiter, RateLimiterConfig};
pub use service::AiAnalysisService;
