//! Unified error types for the collector and the momentum bot.

use thiserror::Error;

/// Unified error type for the crate.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Bet placement error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// API base URL does not parse.
    #[error("MANIFOLD_API_URL is not a valid url: {0}")]
    InvalidUrl(String),

    /// Page size must be positive.
    #[error("PAGE_SIZE must be greater than zero")]
    ZeroPageSize,

    /// Probability thresholds out of order or out of range.
    #[error("probability band is invalid: low={low}, high={high}")]
    InvalidBand {
        /// Lower bound of the band.
        low: f64,
        /// Upper bound of the band.
        high: f64,
    },

    /// Bet stake must be positive.
    #[error("BET_AMOUNT must be positive, got {0}")]
    InvalidBetAmount(rust_decimal::Decimal),
}

/// Market search errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// A search page could not be fetched.
    #[error("failed to fetch markets at offset {offset}: {reason}")]
    FetchFailed {
        /// Offset of the failed page.
        offset: usize,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse market data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Bet placement errors.
#[derive(Error, Debug)]
pub enum TradingError {
    /// No API key configured; raised before any request is sent.
    #[error("API key is missing, set MANIFOLD_API_KEY")]
    MissingCredential,

    /// The API answered the bet request with an error status.
    #[error("bet on {contract_id} rejected: {reason}")]
    BetRejected {
        /// Market the bet was placed on.
        contract_id: String,
        /// Status and body returned by the API.
        reason: String,
    },

    /// Invalid bet parameters.
    #[error("invalid bet parameters: {0}")]
    InvalidParams(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Document store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An observed record lacks the unique identifier field.
    #[error("record at index {index} has no `{field}` field")]
    MissingKey {
        /// Name of the unique identifier field.
        field: String,
        /// Position of the offending record in the batch.
        index: usize,
    },

    /// A record did not serialize to a JSON object.
    #[error("record at index {index} is not a JSON object")]
    NotAnObject {
        /// Position of the offending record in the batch.
        index: usize,
    },

    /// IO error reading/writing the collection file.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Collection file path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
