//! Typed error taxonomy for the trading control plane.
//!
//! Mirrors the exchange-error hierarchy the core distinguishes: callers match on
//! [`ExchangeError`] variants to decide whether a failure is retryable, fatal at
//! startup, or just a reason to skip one trade.

use thiserror::Error;

/// Errors surfaced while talking to an exchange provider.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// HTTP 4xx/5xx or network failure talking to an exchange HTTP/WS endpoint.
    #[error("exchange API error: {0}")]
    Api(String),

    /// Credential derivation or permission failure. Fatal at startup, logged and
    /// blocking for any call made after startup.
    #[error("exchange auth error: {0}")]
    Auth(String),

    /// Order rejected: bad size, unknown market, or a generic rejection.
    #[error("order error: {0}")]
    Order(String),

    /// Balance or position too small to act on.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
}

/// Errors surfaced while loading or validating `strategies.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
