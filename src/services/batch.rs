//! All-or-nothing multi-record operations.
//!
//! Each batch opens one transaction, walks its entries strictly in input
//! order and commits only when every entry succeeded. Any failure rolls the
//! whole transaction back. The batch runs under a deadline; when it expires
//! the in-flight future is dropped together with its transaction handle,
//! which discards every change made so far.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::database::{DatabaseError, Store, StoreTx};
use crate::services::{begin_within, settle};
use crate::record::{apply_patch, Record, RecordError, IDENTIFIER_KEY};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid {label} id at entry {index}: {value}")]
    MalformedIdentifier { index: usize, value: String, label: &'static str },

    #[error("{label} not found: {id}")]
    NotFound { index: usize, id: i64, label: &'static str },

    #[error("Entry {index}: {source}")]
    Entry { index: usize, source: RecordError },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Batch timed out after {0:?}")]
    Timeout(Duration),
}

/// Patch every entry's record inside one transaction.
///
/// Each entry is `{"id": "<n>", field: value, ...}`. Returns the patched
/// records in entry order once the transaction has committed.
pub async fn apply_batch<R: Record>(
    store: &dyn Store,
    entries: &[Map<String, Value>],
    deadline: Duration,
) -> Result<Vec<R>, BatchError> {
    let expires = Instant::now() + deadline;
    let mut tx = begin_within(store, expires, deadline, BatchError::Timeout).await?;
    let outcome = tokio::time::timeout_at(expires, patch_entries::<R>(tx.as_mut(), entries)).await;
    settle(tx, outcome, deadline, BatchError::Timeout).await
}

/// Delete every id inside one transaction; each delete must remove exactly
/// one row. Returns `ids` unchanged on commit.
pub async fn delete_many<R: Record>(
    store: &dyn Store,
    ids: &[i64],
    deadline: Duration,
) -> Result<Vec<i64>, BatchError> {
    let expires = Instant::now() + deadline;
    let mut tx = begin_within(store, expires, deadline, BatchError::Timeout).await?;
    let outcome = tokio::time::timeout_at(expires, delete_ids::<R>(tx.as_mut(), ids)).await;
    settle(tx, outcome, deadline, BatchError::Timeout).await
}

async fn patch_entries<R: Record>(
    tx: &mut dyn StoreTx,
    entries: &[Map<String, Value>],
) -> Result<Vec<R>, BatchError> {
    let descriptor = R::descriptor();
    let schema = descriptor.schema();
    let mut patched = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let id = parse_entry_id::<R>(index, entry)?;

        let row = tx
            .fetch(schema, id)
            .await?
            .ok_or(BatchError::NotFound { index, id, label: R::LABEL })?;
        let existing = descriptor
            .from_row(row)
            .map_err(|source| BatchError::Entry { index, source })?;

        let record = apply_patch(&existing, entry).map_err(|source| BatchError::Entry { index, source })?;

        let affected = tx.update(schema, &descriptor.to_row(id, &record)).await?;
        if affected != 1 {
            return Err(BatchError::NotFound { index, id, label: R::LABEL });
        }
        debug!(table = schema.name, id, index, "patched");
        patched.push(record);
    }

    Ok(patched)
}

async fn delete_ids<R: Record>(tx: &mut dyn StoreTx, ids: &[i64]) -> Result<Vec<i64>, BatchError> {
    let schema = R::descriptor().schema();
    for (index, &id) in ids.iter().enumerate() {
        if tx.delete(schema, id).await? != 1 {
            return Err(BatchError::NotFound { index, id, label: R::LABEL });
        }
        debug!(table = schema.name, id, "deleted");
    }
    Ok(ids.to_vec())
}

/// The entry id must be a JSON string holding a base-10 integer
fn parse_entry_id<R: Record>(index: usize, entry: &Map<String, Value>) -> Result<i64, BatchError> {
    let malformed = |value: String| BatchError::MalformedIdentifier { index, value, label: R::LABEL };
    match entry.get(IDENTIFIER_KEY) {
        Some(Value::String(s)) => s.parse::<i64>().map_err(|_| malformed(s.clone())),
        Some(other) => Err(malformed(other.to_string())),
        None => Err(malformed("missing".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Exec, Student, Teacher};
    use crate::database::MemoryStore;
    use crate::record::FieldKind;
    use crate::testing::{entries, patch_entry, seed, snapshot, student, teacher, SlowStore};
    use serde_json::json;

    const DEADLINE: Duration = Duration::from_secs(5);

    async fn seeded() -> (MemoryStore, Vec<Teacher>) {
        let store = MemoryStore::new();
        let teachers = seed(
            &store,
            &[
                teacher("John", "Doe", "john@school.test", "9A"),
                teacher("Mary", "Major", "mary@school.test", "10B"),
                teacher("Ali", "Khan", "ali@school.test", "11C"),
            ],
        )
        .await;
        (store, teachers)
    }

    #[tokio::test]
    async fn valid_batch_persists_every_update() {
        let (store, before) = seeded().await;
        let batch = entries(json!([
            patch_entry(1, json!({"first_name": "Jane"})),
            patch_entry(3, json!({"class": "12D", "subject": "Art"})),
        ]));

        let patched = apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap();
        assert_eq!(patched.len(), 2);

        let after = snapshot::<Teacher>(&store).await;
        assert_eq!(after[0].first_name, "Jane");
        assert_eq!(after[0].last_name, "Doe");
        assert_eq!(after[0].email, before[0].email);
        assert_eq!(after[1], before[1]);
        assert_eq!(after[2].class, "12D");
        assert_eq!(after[2].subject, "Art");
        assert_eq!(after[2].first_name, "Ali");
    }

    #[tokio::test]
    async fn jane_doe_scenario() {
        let store = MemoryStore::new();
        seed(&store, &[teacher("John", "Doe", "john@school.test", "9A")]).await;

        let batch = entries(json!([{"id": "1", "first_name": "Jane"}]));
        apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap();

        let after = snapshot::<Teacher>(&store).await;
        assert_eq!((after[0].first_name.as_str(), after[0].last_name.as_str()), ("Jane", "Doe"));
    }

    #[tokio::test]
    async fn missing_record_anywhere_rolls_back_everything() {
        for position in 0..3 {
            let (store, before) = seeded().await;
            let mut batch = vec![
                patch_entry(1, json!({"first_name": "Jane"})),
                patch_entry(2, json!({"first_name": "Jill"})),
            ];
            batch.insert(position, patch_entry(999, json!({"first_name": "Ghost"})));

            let err = apply_batch::<Teacher>(&store, &entries(Value::Array(batch)), DEADLINE)
                .await
                .unwrap_err();
            assert!(
                matches!(err, BatchError::NotFound { index, id: 999, .. } if index == position),
                "position {position}: {err:?}"
            );
            assert_eq!(snapshot::<Teacher>(&store).await, before);
        }
    }

    #[tokio::test]
    async fn second_entry_missing_keeps_first_record_unchanged() {
        let (store, _) = seeded().await;
        let batch = entries(json!([
            {"id": "1", "first_name": "Jane"},
            {"id": "999", "first_name": "Ghost"},
        ]));
        assert!(apply_batch::<Teacher>(&store, &batch, DEADLINE).await.is_err());
        assert_eq!(snapshot::<Teacher>(&store).await[0].first_name, "John");
    }

    #[tokio::test]
    async fn coercion_failure_rolls_back() {
        let (store, before) = seeded().await;
        let batch = entries(json!([
            patch_entry(1, json!({"first_name": "Jane"})),
            patch_entry(2, json!({"class": 10})),
        ]));

        let err = apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap_err();
        match err {
            BatchError::Entry { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(
                    source,
                    RecordError::FieldCoercion { field: "class".into(), expected: FieldKind::Text, found: "number" }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(snapshot::<Teacher>(&store).await, before);
    }

    #[tokio::test]
    async fn malformed_identifiers_are_rejected() {
        let (store, before) = seeded().await;
        for bad in [
            json!({"id": 1}),
            json!({"id": "one"}),
            json!({"id": " 1"}),
            json!({"id": "1 "}),
            json!({"first_name": "x"}),
        ] {
            let batch = entries(json!([patch_entry(2, json!({"first_name": "Jill"})), bad]));
            let err = apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap_err();
            assert!(matches!(err, BatchError::MalformedIdentifier { index: 1, .. }), "{err:?}");
        }
        assert_eq!(snapshot::<Teacher>(&store).await, before);
    }

    #[tokio::test]
    async fn applying_a_batch_twice_is_idempotent() {
        let (store, _) = seeded().await;
        let batch = entries(json!([
            patch_entry(1, json!({"first_name": "Jane", "subject": "Art"})),
            patch_entry(2, json!({"email": "m.major@school.test"})),
        ]));

        apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap();
        let once = snapshot::<Teacher>(&store).await;
        apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap();
        assert_eq!(snapshot::<Teacher>(&store).await, once);
    }

    #[tokio::test]
    async fn duplicate_unique_value_rolls_back() {
        let (store, before) = seeded().await;
        let batch = entries(json!([
            patch_entry(3, json!({"first_name": "Alistair"})),
            patch_entry(2, json!({"email": "john@school.test"})),
        ]));

        let err = apply_batch::<Teacher>(&store, &batch, DEADLINE).await.unwrap_err();
        assert!(matches!(err, BatchError::Database(DatabaseError::Duplicate(_))));
        assert_eq!(snapshot::<Teacher>(&store).await, before);
    }

    #[tokio::test]
    async fn exec_fields_patch_with_declared_types() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[Exec {
                first_name: "Sam".into(),
                last_name: "Head".into(),
                email: "sam@school.test".into(),
                username: "sam".into(),
                role: "admin".into(),
                ..Exec::default()
            }],
        )
        .await;

        let batch = entries(json!([{"id": "1", "inactive_status": true, "user_updated_at": "2024-05-01"}]));
        apply_batch::<Exec>(&store, &batch, DEADLINE).await.unwrap();

        let exec = &snapshot::<Exec>(&store).await[0];
        assert!(exec.inactive_status);
        assert_eq!(exec.user_updated_at.as_deref(), Some("2024-05-01"));
        assert_eq!(exec.username, "sam");
    }

    #[tokio::test]
    async fn delete_many_with_missing_id_deletes_nothing() {
        let store = MemoryStore::new();
        let students = seed(
            &store,
            &[
                student("Ann", "ann@school.test", "9A"),
                student("Ben", "ben@school.test", "9A"),
                student("Cat", "cat@school.test", "9A"),
            ],
        )
        .await;
        delete_many::<Student>(&store, &[2], DEADLINE).await.unwrap();

        let err = delete_many::<Student>(&store, &[1, 2, 3], DEADLINE).await.unwrap_err();
        assert!(matches!(err, BatchError::NotFound { index: 1, id: 2, .. }));

        let remaining = snapshot::<Student>(&store).await;
        assert_eq!(remaining, vec![students[0].clone(), students[2].clone()]);
    }

    #[tokio::test]
    async fn delete_many_returns_input_ids() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[student("Ann", "ann@school.test", "9A"), student("Ben", "ben@school.test", "9A")],
        )
        .await;
        let deleted = delete_many::<Student>(&store, &[2, 1], DEADLINE).await.unwrap();
        assert_eq!(deleted, vec![2, 1]);
        assert!(snapshot::<Student>(&store).await.is_empty());
    }

    #[tokio::test]
    async fn waiting_for_a_transaction_counts_against_the_deadline() {
        let (store, before) = seeded().await;
        let held = store.begin().await.unwrap();
        let batch = entries(json!([patch_entry(1, json!({"first_name": "Jane"}))]));

        let started = std::time::Instant::now();
        let err = apply_batch::<Teacher>(&store, &batch, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Timeout(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(1));

        let err = delete_many::<Teacher>(&store, &[1], Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, BatchError::Timeout(_)), "{err:?}");

        drop(held);
        assert_eq!(snapshot::<Teacher>(&store).await, before);
    }

    #[tokio::test]
    async fn deadline_expiry_rolls_back() {
        let (memory, before) = seeded().await;
        let store = SlowStore::new(memory.clone(), Duration::from_millis(50));
        let batch = entries(json!([
            patch_entry(1, json!({"first_name": "Jane"})),
            patch_entry(2, json!({"first_name": "Jill"})),
            patch_entry(3, json!({"first_name": "Jo"})),
        ]));

        let err = apply_batch::<Teacher>(&store, &batch, Duration::from_millis(80))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Timeout(_)));
        assert_eq!(snapshot::<Teacher>(&memory).await, before);
    }
}
