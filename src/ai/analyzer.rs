//! The AI analyzer boundary plus HTTP clients for Anthropic and Gemini.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketMetadata, SportsSelectivityResult, TradeAnalysis};
use crate::error::Result;

/// Everything the analyzer needs to judge one trade; assembled by the AI
/// analysis service from a [`TradeEvent`] before the request is rate-limited
/// and dispatched.
///
/// [`TradeEvent`]: crate::domain::TradeEvent
#[derive(Debug, Clone, Serialize)]
pub struct TradeContext {
    pub whale_name: String,
    pub whale_address: String,
    pub trade_size_usd: Decimal,
    pub outcome: Option<String>,
    pub market_slug: Option<String>,
    pub trade_side: String,
    pub timestamp: i64,
}

/// Abstract boundary to whatever model backs trade analysis and category
/// classification. Implementations must be resilient: any internal failure
/// should surface as an `Err` so the caller can fall back to a blocking
/// [`TradeAnalysis`], never as a silently-approving default.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Judge whether a mirrored trade is worth taking.
    async fn analyze_trade(&self, context: &TradeContext) -> Result<TradeAnalysis>;

    /// Whether this market should be excluded as a sports market outright.
    async fn is_sports_market(&self, metadata: &MarketMetadata) -> Result<bool>;

    /// For markets that pass the sports filter, a stricter selectivity pass
    /// used to decide whether an otherwise-eligible sports-adjacent market is
    /// still worth considering.
    async fn evaluate_sports_selectivity(&self, context: &TradeContext) -> Result<SportsSelectivityResult>;

    /// Whether this market is a crypto spot/price-threshold market. Used only
    /// to select a risk band, never to block entry.
    async fn is_crypto_price_market(&self, metadata: &MarketMetadata) -> Result<bool>;
}

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Anthropic Claude-backed analyzer.
pub struct AnthropicAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f64,
}

impl AnthropicAnalyzer {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    /// Build from `ANTHROPIC_API_KEY` in the process environment.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            crate::error::ConfigError::MissingField { field: "ANTHROPIC_API_KEY" }
        })?;
        Ok(Self::new(api_key, model))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            max_tokens: usize,
            temperature: f64,
            messages: Vec<MessageReq<'a>>,
        }
        #[derive(Serialize)]
        struct MessageReq<'a> {
            role: &'static str,
            content: &'a str,
        }
        #[derive(Deserialize)]
        struct Response {
            content: Vec<ContentBlock>,
        }
        #[derive(Deserialize)]
        struct ContentBlock {
            text: String,
        }

        let request = Request {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![MessageReq { role: "user", content: prompt }],
        };

        let response: Response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.content.into_iter().map(|c| c.text).collect::<Vec<_>>().join(""))
    }
}

fn build_trade_prompt(context: &TradeContext) -> String {
    format!(
        "A wallet named \"{}\" ({}) placed a {} order worth ${} on outcome {:?} in market {:?} at {}. \
         Respond with a JSON object: should_trade (bool), confidence (0-1), justification (string), \
         risk_factors (string array), opportunity_factors (string array), \
         estimated_resolution_time (string or null), subjectivity_score (0-1 or null).",
        context.whale_name,
        context.whale_address,
        context.trade_side,
        context.trade_size_usd,
        context.outcome,
        context.market_slug,
        context.timestamp,
    )
}

#[async_trait]
impl Analyzer for AnthropicAnalyzer {
    async fn analyze_trade(&self, context: &TradeContext) -> Result<TradeAnalysis> {
        let prompt = build_trade_prompt(context);
        let text = self.complete(&prompt).await?;
        serde_json::from_str(&text).or_else(|_| {
            Ok(TradeAnalysis::blocked(format!(
                "analyzer returned an unparseable response: {text}"
            )))
        })
    }

    async fn is_sports_market(&self, metadata: &MarketMetadata) -> Result<bool> {
        let prompt = format!(
            "Is the following prediction market primarily about a sports game or competition? \
             Title: {:?}. Question: {:?}. Respond with exactly \"true\" or \"false\".",
            metadata.title, metadata.question
        );
        let text = self.complete(&prompt).await?;
        Ok(text.trim().eq_ignore_ascii_case("true"))
    }

    async fn evaluate_sports_selectivity(&self, context: &TradeContext) -> Result<SportsSelectivityResult> {
        let prompt = format!(
            "A sports-adjacent market trade was observed: whale={}, size=${}, market={:?}. \
             Should this still be considered despite the sports filter? \
             Respond with JSON: should_consider (bool), reasoning (string).",
            context.whale_name, context.trade_size_usd, context.market_slug
        );
        let text = self.complete(&prompt).await?;
        serde_json::from_str(&text).map_err(Into::into)
    }

    async fn is_crypto_price_market(&self, metadata: &MarketMetadata) -> Result<bool> {
        let prompt = format!(
            "Is the following prediction market a crypto asset price-threshold market \
             (e.g. \"will BTC be above $X\")? Title: {:?}. Question: {:?}. \
             Respond with exactly \"true\" or \"false\".",
            metadata.title, metadata.question
        );
        let text = self.complete(&prompt).await?;
        Ok(text.trim().eq_ignore_ascii_case("true"))
    }
}

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Gemini-backed analyzer, used as an alternate/fallback provider.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiAnalyzer {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            crate::error::ConfigError::MissingField { field: "GEMINI_API_KEY" }
        })?;
        Ok(Self::new(api_key))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Deserialize)]
        struct Response {
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            parts: Vec<ResponsePart>,
        }
        #[derive(Deserialize)]
        struct ResponsePart {
            text: String,
        }

        let request = Request {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };

        let response: Response = self
            .client
            .post(GEMINI_API_URL)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default())
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze_trade(&self, context: &TradeContext) -> Result<TradeAnalysis> {
        let prompt = build_trade_prompt(context);
        let text = self.complete(&prompt).await?;
        serde_json::from_str(&text).or_else(|_| {
            Ok(TradeAnalysis::blocked(format!(
                "analyzer returned an unparseable response: {text}"
            )))
        })
    }

    async fn is_sports_market(&self, metadata: &MarketMetadata) -> Result<bool> {
        let prompt = format!(
            "Is this market primarily about a sports game? Title: {:?}. Question: {:?}. \
             Respond with exactly \"true\" or \"false\".",
            metadata.title, metadata.question
        );
        let text = self.complete(&prompt).await?;
        Ok(text.trim().eq_ignore_ascii_case("true"))
    }

    async fn evaluate_sports_selectivity(&self, context: &TradeContext) -> Result<SportsSelectivityResult> {
        let prompt = format!(
            "Sports-adjacent trade observed: whale={}, size=${}, market={:?}. Should we still \
             consider it? Respond with JSON: should_consider (bool), reasoning (string).",
            context.whale_name, context.trade_size_usd, context.market_slug
        );
        let text = self.complete(&prompt).await?;
        serde_json::from_str(&text).map_err(Into::into)
    }

    async fn is_crypto_price_market(&self, metadata: &MarketMetadata) -> Result<bool> {
        let prompt = format!(
            "Is this a crypto price-threshold market? Title: {:?}. Question: {:?}. \
             Respond with exactly \"true\" or \"false\".",
            metadata.title, metadata.question
        );
        let text = self.complete(&prompt).await?;
        Ok(text.trim().eq_ignore_ascii_case("true"))
    }
}
