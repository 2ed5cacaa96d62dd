//! Field projection for raw API objects.

use serde_json::{Map, Value};

/// Market fields kept in the snapshot.
pub const MARKET_FIELDS: &[&str] = &[
    "id",
    "createdTime",
    "closeTime",
    "question",
    "probability",
    "totalLiquidity",
    "outcomeType",
    "isResolved",
    "resolution",
    "resolutionTime",
    "token",
];

/// Project one object down to `fields`. Missing fields stay missing.
pub fn project(item: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|&key| item.get(key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

/// Project every object in `items` down to `fields`.
///
/// Non-object entries carry no fields and are dropped.
pub fn filter_fields(items: &[Value], fields: &[&str]) -> Vec<Map<String, Value>> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| project(item, fields))
        .collect()
}
