//! Market and bet request types for the Manifold Markets API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Outcome of a binary market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Outcome {
    /// Resolves YES.
    #[default]
    Yes,
    /// Resolves NO.
    No,
}

/// A market as kept in the snapshot collection.
///
/// Only the allow-listed fields are typed; anything else the API sends
/// survives in `extra`. Absent fields are not serialized, so a stored
/// document holds exactly the fields that were observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Unique market identifier.
    pub id: String,
    /// Creation time, unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    /// Close time, unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<i64>,
    /// Market question text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Current YES probability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Total liquidity in the market's token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_liquidity: Option<f64>,
    /// Contract type, e.g. "BINARY".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_type: Option<String>,
    /// Whether the market has resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_resolved: Option<bool>,
    /// Resolution value if resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Resolution time, unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<i64>,
    /// Currency token, "MANA" or "CASH".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Fields outside the typed set.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Market {
    /// Minimal market with only an id, mostly for tests and builders.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_time: None,
            close_time: None,
            question: None,
            probability: None,
            total_liquidity: None,
            outcome_type: None,
            is_resolved: None,
            resolution: None,
            resolution_time: None,
            token: None,
            extra: Map::new(),
        }
    }
}

/// Body of `POST /bet`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest<'a> {
    /// Market to bet on.
    pub contract_id: &'a str,
    /// Outcome to buy.
    pub outcome: Outcome,
    /// Amount to stake, sent as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: rust_decimal::Decimal,
}
