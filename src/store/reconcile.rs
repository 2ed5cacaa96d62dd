//! Upsert of observed records into a collection, keyed by a unique field.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::metrics;

use super::collection::Collection;
use super::{documents_eq, key_string, Document};

/// Unique identifier field used when none is given.
pub const DEFAULT_UNIQUE_ID_FIELD: &str = "id";

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records that were not in the collection.
    pub inserted: usize,
    /// Records that replaced a differing stored document.
    pub updated: usize,
    /// Records equal to the stored document; nothing written.
    pub unchanged: usize,
}

impl ReconcileSummary {
    /// `(new_count, changed_count)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.inserted, self.updated)
    }

    /// Number of records classified.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

/// Insert new records and replace changed ones in `collection`.
///
/// Each observed record is looked up by `unique_id_field` among the stored
/// documents that have that field. Not found: inserted (all new records go
/// in one bulk insert). Found but not deeply equal: the stored document is
/// replaced in full. Equal: skipped. A later record in the batch with the
/// same key is compared against the earlier one.
///
/// Every record must serialize to an object carrying `unique_id_field`;
/// otherwise nothing is written and [`StoreError::MissingKey`] is returned.
/// The whole batch is persisted with a single file replacement.
#[instrument(skip(collection, observed), fields(batch = observed.len()))]
pub fn reconcile<T: Serialize>(
    collection: &mut Collection,
    observed: &[T],
    unique_id_field: &str,
) -> Result<ReconcileSummary, StoreError> {
    let documents = to_documents(observed, unique_id_field)?;

    let mut summary = ReconcileSummary::default();
    let mut inserts: Vec<Document> = Vec::new();
    let mut updates: Vec<(Value, Document)> = Vec::new();

    {
        let existing: HashMap<String, &Document> = collection
            .all()
            .filter_map(|doc| doc.get(unique_id_field).map(|key| (key_string(key), doc)))
            .collect();
        let mut staged: HashMap<String, Document> = HashMap::new();

        for doc in documents {
            let key_value = doc[unique_id_field].clone();
            let key = key_string(&key_value);

            let current = staged.get(&key).or_else(|| existing.get(&key).copied());
            match current {
                None => {
                    summary.inserted += 1;
                    inserts.push(doc.clone());
                }
                Some(stored) if !documents_eq(stored, &doc) => {
                    summary.updated += 1;
                    updates.push((key_value, doc.clone()));
                }
                Some(_) => {
                    summary.unchanged += 1;
                    continue;
                }
            }
            staged.insert(key, doc);
        }
    }

    let mut rollback = collection.begin();
    collection.stage_insert(inserts, &mut rollback);
    for (key_value, doc) in updates {
        collection.stage_update(unique_id_field, &key_value, doc, &mut rollback);
    }
    collection.commit(rollback)?;

    metrics::add_records_inserted(summary.inserted);
    metrics::add_records_updated(summary.updated);
    debug!(
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "Reconciled batch"
    );

    Ok(summary)
}

fn to_documents<T: Serialize>(
    observed: &[T],
    unique_id_field: &str,
) -> Result<Vec<Document>, StoreError> {
    observed
        .iter()
        .enumerate()
        .map(|(index, record)| match serde_json::to_value(record)? {
            Value::Object(doc) if doc.contains_key(unique_id_field) => Ok(doc),
            Value::Object(_) => Err(StoreError::MissingKey {
                field: unique_id_field.to_string(),
                index,
            }),
            _ => Err(StoreError::NotAnObject { index }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn contents(collection: &Collection) -> Vec<Document> {
        collection.all().cloned().collect()
    }

    #[test]
    fn inserts_and_updates() {
        let mut collection = Collection::in_memory();
        collection
            .insert(doc(json!({"id": "A", "probability": 0.5})))
            .unwrap();

        let batch = vec![
            json!({"id": "A", "probability": 0.6}),
            json!({"id": "B", "probability": 0.9}),
        ];
        let summary = reconcile(&mut collection, &batch, DEFAULT_UNIQUE_ID_FIELD).unwrap();

        assert_eq!(summary.counts(), (1, 1));
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.search("id", &json!("A")).next().unwrap().1,
            &doc(json!({"id": "A", "probability": 0.6}))
        );
    }

    #[test]
    fn empty_batch_changes_nothing() {
        let mut collection = Collection::in_memory();
        collection.insert(doc(json!({"id": "A"}))).unwrap();
        let before = contents(&collection);
        let writes = collection.write_count();

        let summary = reconcile::<Value>(&mut collection, &[], "id").unwrap();

        assert_eq!(summary.counts(), (0, 0));
        assert_eq!(contents(&collection), before);
        assert_eq!(collection.write_count(), writes);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut collection = Collection::in_memory();
        collection.insert(doc(json!({"id": "A", "p": 0.1}))).unwrap();
        let batch = vec![
            json!({"id": "A", "p": 0.2}),
            json!({"id": "B", "p": 0.3}),
            json!({"id": "C", "p": 0.4}),
        ];

        let first = reconcile(&mut collection, &batch, "id").unwrap();
        let after_first = contents(&collection);
        let second = reconcile(&mut collection, &batch, "id").unwrap();

        assert_eq!(first.counts(), (2, 1));
        assert_eq!(second.counts(), (0, 0));
        assert_eq!(second.unchanged, 3);
        assert_eq!(contents(&collection), after_first);
    }

    #[test]
    fn every_record_is_classified_once() {
        let mut collection = Collection::in_memory();
        collection
            .insert_multiple(vec![
                doc(json!({"id": 1, "v": "same"})),
                doc(json!({"id": 2, "v": "old"})),
            ])
            .unwrap();
        let batch = vec![
            json!({"id": 1, "v": "same"}),
            json!({"id": 2, "v": "new"}),
            json!({"id": 3, "v": "fresh"}),
            json!({"id": 4, "v": "fresh"}),
        ];

        let summary = reconcile(&mut collection, &batch, "id").unwrap();

        assert_eq!(summary, ReconcileSummary { inserted: 2, updated: 1, unchanged: 1 });
        assert_eq!(summary.total(), batch.len());
    }

    #[test]
    fn equal_record_is_not_written() {
        let mut collection = Collection::in_memory();
        collection
            .insert(doc(json!({"id": "A", "totalLiquidity": 1000})))
            .unwrap();
        let writes = collection.write_count();

        // Float vs int representation of the same number counts as equal.
        let summary =
            reconcile(&mut collection, &[json!({"id": "A", "totalLiquidity": 1000.0})], "id")
                .unwrap();

        assert_eq!(summary.unchanged, 1);
        assert_eq!(collection.write_count(), writes);
    }

    #[test]
    fn stored_documents_without_key_are_left_alone() {
        let mut collection = Collection::in_memory();
        collection.insert(doc(json!({"note": "no id here"}))).unwrap();

        let summary = reconcile(&mut collection, &[json!({"id": "A"})], "id").unwrap();

        assert_eq!(summary.counts(), (1, 0));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(1), Some(&doc(json!({"note": "no id here"}))));
    }

    #[test]
    fn records_absent_from_batch_are_untouched() {
        let mut collection = Collection::in_memory();
        collection
            .insert_multiple(vec![doc(json!({"id": "A", "p": 1})), doc(json!({"id": "Z", "p": 9}))])
            .unwrap();

        reconcile(&mut collection, &[json!({"id": "A", "p": 2})], "id").unwrap();

        assert_eq!(collection.get(2), Some(&doc(json!({"id": "Z", "p": 9}))));
    }

    #[test]
    fn missing_key_rejects_batch_without_writing() {
        let mut collection = Collection::in_memory();
        let batch = vec![json!({"id": "A"}), json!({"question": "no id"})];

        let err = reconcile(&mut collection, &batch, "id").unwrap_err();

        assert!(matches!(err, StoreError::MissingKey { ref field, index: 1 } if field == "id"));
        assert!(collection.is_empty());
        assert_eq!(collection.write_count(), 0);
    }

    #[test]
    fn non_object_record_is_rejected() {
        let mut collection = Collection::in_memory();
        let err = reconcile(&mut collection, &[json!([1, 2])], "id").unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject { index: 0 }));
    }

    #[test]
    fn custom_key_field() {
        let mut collection = Collection::in_memory();
        collection
            .insert(doc(json!({"contractId": "m1", "amount": 5})))
            .unwrap();

        let summary = reconcile(
            &mut collection,
            &[json!({"contractId": "m1", "amount": 10}), json!({"contractId": "m2"})],
            "contractId",
        )
        .unwrap();

        assert_eq!(summary.counts(), (1, 1));
    }

    #[test]
    fn duplicate_keys_in_batch_compare_against_earlier_record() {
        let mut collection = Collection::in_memory();
        let batch = vec![
            json!({"id": "A", "p": 1}),
            json!({"id": "A", "p": 1}),
            json!({"id": "A", "p": 2}),
        ];

        let summary = reconcile(&mut collection, &batch, "id").unwrap();

        assert_eq!(summary, ReconcileSummary { inserted: 1, updated: 1, unchanged: 1 });
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(1), Some(&doc(json!({"id": "A", "p": 2}))));
    }

    #[test]
    fn neighbouring_large_integer_keys_stay_distinct() {
        let mut collection = Collection::in_memory();
        collection
            .insert(doc(json!({"id": 9_007_199_254_740_992_u64, "v": "first"})))
            .unwrap();

        let summary = reconcile(
            &mut collection,
            &[json!({"id": 9_007_199_254_740_993_u64, "v": "second"})],
            "id",
        )
        .unwrap();

        assert_eq!(summary.counts(), (1, 0));
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.get(1),
            Some(&doc(json!({"id": 9_007_199_254_740_992_u64, "v": "first"})))
        );
    }

    #[test]
    fn large_integer_field_change_is_an_update() {
        let mut collection = Collection::in_memory();
        collection
            .insert(doc(json!({"id": "A", "n": 9_007_199_254_740_992_u64})))
            .unwrap();

        let summary = reconcile(
            &mut collection,
            &[json!({"id": "A", "n": 9_007_199_254_740_993_u64})],
            "id",
        )
        .unwrap();

        assert_eq!(summary.counts(), (0, 1));
        assert_eq!(collection.get(1).unwrap()["n"], json!(9_007_199_254_740_993_u64));
    }

    #[test]
    fn failed_commit_leaves_batch_unapplied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markets_db.json");
        let mut collection = Collection::open(&path).unwrap();
        reconcile(&mut collection, &[json!({"id": "A", "p": 0.1})], "id").unwrap();
        let before = contents(&collection);
        let writes = collection.write_count();

        // A directory in place of the file makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let batch = vec![json!({"id": "A", "p": 0.2}), json!({"id": "B", "p": 0.3})];
        let result = reconcile(&mut collection, &batch, "id");

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(contents(&collection), before);
        assert_eq!(collection.write_count(), writes);
        assert!(!dir.path().join("markets_db.json.tmp").exists());

        std::fs::remove_dir(&path).unwrap();
        let summary = reconcile(&mut collection, &batch, "id").unwrap();
        assert_eq!(summary.counts(), (1, 1));
        assert_eq!(collection.get(2), Some(&doc(json!({"id": "B", "p": 0.3}))));
        assert_eq!(Collection::open(&path).unwrap().len(), 2);
    }

    #[test]
    fn typed_markets_reconcile_and_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markets_db.json");
        let mut market = Market::new("m1");
        market.probability = Some(0.5);

        let mut collection = Collection::open(&path).unwrap();
        reconcile(&mut collection, &[market.clone()], "id").unwrap();

        let mut reopened = Collection::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        let summary = reconcile(&mut reopened, &[market], "id").unwrap();
        assert_eq!(summary.counts(), (0, 0));
    }
}
