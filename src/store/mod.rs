//! Local document store and reconciliation.
//!
//! - [`Collection`]: JSON documents persisted to one file
//! - [`reconcile`]: insert new, replace changed, skip unchanged records

pub mod collection;
pub mod reconcile;

use serde_json::{Map, Number, Value};

pub use collection::{Collection, DocId};
pub use reconcile::{reconcile, ReconcileSummary, DEFAULT_UNIQUE_ID_FIELD};

/// A stored record.
pub type Document = Map<String, Value>;

/// Deep equality where `1` and `1.0` are the same number.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => documents_eq(xs, ys),
        _ => a == b,
    }
}

/// [`json_eq`] over two documents.
pub fn documents_eq(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, x)| b.get(key).is_some_and(|y| json_eq(x, y)))
}

/// Integers compare exactly. A float equals an integer only when it is
/// integral and has the same value.
fn numbers_eq(x: &Number, y: &Number) -> bool {
    match (int_value(x), int_value(y)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => y.as_f64().and_then(integral) == Some(i),
        (None, Some(i)) => x.as_f64().and_then(integral) == Some(i),
        (None, None) => x.as_f64() == y.as_f64(),
    }
}

fn int_value(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn integral(f: f64) -> Option<i128> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38).then(|| f as i128)
}

/// Hashable form of a key value, consistent with [`json_eq`].
pub(crate) fn key_string(value: &Value) -> String {
    match value {
        Value::Number(n) => match int_value(n).or_else(|| n.as_f64().and_then(integral)) {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}
