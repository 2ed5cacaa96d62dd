//! Mock market API for unit testing.
//!
//! This module provides a mock client that can be used in tests
//! without making real network requests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{MarketError, TradingError};

use super::client::{MarketApi, SearchParams};
use super::types::Outcome;
use crate::store::Document;

/// A bet call recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct MockBetCall {
    /// Market bet on.
    pub contract_id: String,
    /// Outcome bought.
    pub outcome: Outcome,
    /// Amount staked.
    pub amount: Decimal,
}

/// Configuration for mock client behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Page offsets whose search request fails.
    pub failing_offsets: HashSet<usize>,
    /// Contract ids whose bet request fails.
    pub failing_bets: HashSet<String>,
    /// Whether bets fail as if no API key were configured.
    pub missing_credential: bool,
    /// Bet response bodies by contract id, replacing the default body.
    pub bet_responses: HashMap<String, Document>,
}

/// Mock Manifold client for testing.
#[derive(Debug, Clone, Default)]
pub struct MockManifoldClient {
    /// Mock configuration.
    config: MockConfig,
    /// Raw market objects served by `search_markets`, in result order.
    markets: Arc<Mutex<Vec<Value>>>,
    /// Recorded search requests.
    searches: Arc<Mutex<Vec<SearchParams>>>,
    /// Recorded bet requests.
    bets: Arc<Mutex<Vec<MockBetCall>>>,
}

impl MockManifoldClient {
    /// Create a new mock client with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock client with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the served market list.
    pub fn set_markets(&self, markets: Vec<Value>) {
        *self.markets.lock().unwrap() = markets;
    }

    /// Search requests seen so far.
    pub fn searches(&self) -> Vec<SearchParams> {
        self.searches.lock().unwrap().clone()
    }

    /// Bet requests seen so far, including failed ones.
    pub fn bet_calls(&self) -> Vec<MockBetCall> {
        self.bets.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketApi for MockManifoldClient {
    async fn search_markets(&self, params: &SearchParams) -> Result<Vec<Value>, MarketError> {
        self.searches.lock().unwrap().push(params.clone());

        if self.config.failing_offsets.contains(&params.offset) {
            return Err(MarketError::FetchFailed {
                offset: params.offset,
                reason: "Mock search failure".to_string(),
            });
        }

        let markets = self.markets.lock().unwrap();
        Ok(markets
            .iter()
            .skip(params.offset)
            .take(params.limit)
            .cloned()
            .collect())
    }

    async fn place_bet(
        &self,
        contract_id: &str,
        outcome: Outcome,
        amount: Decimal,
    ) -> Result<Document, TradingError> {
        if self.config.missing_credential {
            return Err(TradingError::MissingCredential);
        }

        let mut bets = self.bets.lock().unwrap();
        bets.push(MockBetCall {
            contract_id: contract_id.to_string(),
            outcome,
            amount,
        });

        if self.config.failing_bets.contains(contract_id) {
            return Err(TradingError::BetRejected {
                contract_id: contract_id.to_string(),
                reason: "Mock bet failure".to_string(),
            });
        }

        if let Some(body) = self.config.bet_responses.get(contract_id) {
            return Ok(body.clone());
        }

        let mut bet = Document::new();
        bet.insert("contractId".to_string(), json!(contract_id));
        bet.insert("betId".to_string(), json!(format!("mock-bet-{}", bets.len())));
        bet.insert("outcome".to_string(), json!(outcome));
        bet.insert("amount".to_string(), json!(amount.to_f64()));
        bet.insert("isFilled".to_string(), json!(true));
        Ok(bet)
    }
}
