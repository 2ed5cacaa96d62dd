//! Manifold Markets REST API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{MarketError, TradingError};
use crate::metrics;
use crate::store::Document;

use super::types::{BetRequest, Outcome};

/// Query for `GET /search-markets`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Free-text search term.
    pub term: String,
    /// Sort order, e.g. "score" or "newest".
    pub sort: String,
    /// Status filter, e.g. "open".
    pub filter: String,
    /// Contract type, e.g. "BINARY".
    pub contract_type: String,
    /// Page size.
    pub limit: usize,
    /// Page offset.
    pub offset: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            term: String::new(),
            sort: "score".to_string(),
            filter: "open".to_string(),
            contract_type: "BINARY".to_string(),
            limit: 100,
            offset: 0,
        }
    }
}

impl SearchParams {
    /// Open binary markets by score, one page.
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    fn to_query(&self) -> [(&'static str, String); 6] {
        [
            ("term", self.term.clone()),
            ("sort", self.sort.clone()),
            ("filter", self.filter.clone()),
            ("contractType", self.contract_type.clone()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ]
    }
}

/// Operations the pipeline and strategy need from the market API.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Fetch one page of raw market objects.
    async fn search_markets(&self, params: &SearchParams) -> Result<Vec<Value>, MarketError>;

    /// Place a bet and return the bet object the API created, as sent.
    async fn place_bet(
        &self,
        contract_id: &str,
        outcome: Outcome,
        amount: Decimal,
    ) -> Result<Document, TradingError>;
}

/// Manifold Markets API client.
#[derive(Debug, Clone)]
pub struct ManifoldClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, without trailing slash.
    base_url: String,
    /// API key for authenticated endpoints.
    api_key: Option<String>,
}

impl ManifoldClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let api_key = config
            .manifold_api_key
            .clone()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            http,
            base_url: config.manifold_api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

}

#[async_trait]
impl MarketApi for ManifoldClient {
    #[instrument(skip_all, fields(limit = params.limit, offset = params.offset))]
    async fn search_markets(&self, params: &SearchParams) -> Result<Vec<Value>, MarketError> {
        let url = format!("{}/search-markets", self.base_url);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&params.to_query())
            .send()
            .await?;

        metrics::record_http_latency(start, "search-markets");

        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                offset: params.offset,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let markets: Vec<Value> = response.json().await.map_err(|e| {
            MarketError::ParseError(format!("Failed to parse search response: {}", e))
        })?;

        debug!(count = markets.len(), "Fetched market page");

        Ok(markets)
    }

    #[instrument(skip_all, fields(contract_id = %contract_id, outcome = %outcome, amount = %amount))]
    async fn place_bet(
        &self,
        contract_id: &str,
        outcome: Outcome,
        amount: Decimal,
    ) -> Result<Document, TradingError> {
        let api_key = self.api_key.as_deref().ok_or(TradingError::MissingCredential)?;

        if contract_id.is_empty() {
            return Err(TradingError::InvalidParams("empty contract id".to_string()));
        }

        let url = format!("{}/bet", self.base_url);
        let body = BetRequest {
            contract_id,
            outcome,
            amount,
        };
        let start = Instant::now();

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Key {}", api_key))
            .json(&body)
            .send()
            .await?;

        metrics::record_http_latency(start, "bet");

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Bet request rejected");
            return Err(TradingError::BetRejected {
                contract_id: contract_id.to_string(),
                reason: format!("HTTP {} - {}", status, text),
            });
        }

        let text = response.text().await?;
        Ok(bet_document(contract_id, &text))
    }
}

/// The accepted bet as returned by the API. A body that is not a JSON object
/// is kept verbatim under `response`, with the market id alongside.
fn bet_document(contract_id: &str, body: &str) -> Document {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(bet)) => bet,
        parsed => {
            warn!(contract_id, "Bet accepted with an unexpected response body");
            let mut bet = Document::new();
            bet.insert("contractId".to_string(), Value::from(contract_id));
            bet.insert(
                "response".to_string(),
                parsed.unwrap_or_else(|_| Value::from(body)),
            );
            bet
        }
    }
}
