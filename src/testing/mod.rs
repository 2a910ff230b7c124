use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::database::models::{Student, Teacher};
use crate::database::{DatabaseError, MemoryStore, Row, Store, StoreTx, TableSchema};
use crate::filter::ListFilter;
use crate::record::{FieldValue, Record};

/// Wraps a [`MemoryStore`] and records how often storage was reached
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, calls: Arc::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    fn backend(&self) -> &'static str {
        "counting"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.begin().await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.health_check().await
    }

    async fn migrate(&self, tables: &[&TableSchema]) -> Result<(), DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.migrate(tables).await
    }
}

/// Every `fetch` sleeps for `delay` before reaching the inner store
#[derive(Clone)]
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl Store for SlowStore {
    fn backend(&self) -> &'static str {
        "slow"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(SlowTx { inner, delay: self.delay }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::QueryError("slow store is never healthy".into()))
    }

    async fn migrate(&self, tables: &[&TableSchema]) -> Result<(), DatabaseError> {
        self.inner.migrate(tables).await
    }
}

struct SlowTx {
    inner: Box<dyn StoreTx>,
    delay: Duration,
}

#[async_trait]
impl StoreTx for SlowTx {
    async fn select(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError> {
        self.inner.select(table, filter).await
    }

    async fn count(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<i64, DatabaseError> {
        self.inner.count(table, filter).await
    }

    async fn fetch(&mut self, table: &TableSchema, id: i64) -> Result<Option<Row>, DatabaseError> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(table, id).await
    }

    async fn insert(&mut self, table: &TableSchema, values: &[FieldValue]) -> Result<i64, DatabaseError> {
        self.inner.insert(table, values).await
    }

    async fn update(&mut self, table: &TableSchema, row: &Row) -> Result<u64, DatabaseError> {
        self.inner.update(table, row).await
    }

    async fn delete(&mut self, table: &TableSchema, id: i64) -> Result<u64, DatabaseError> {
        self.inner.delete(table, id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.rollback().await
    }
}

pub fn teacher(first: &str, last: &str, email: &str, class: &str) -> Teacher {
    Teacher {
        id: None,
        first_name: first.into(),
        last_name: last.into(),
        email: email.into(),
        class: class.into(),
        subject: "Math".into(),
    }
}

pub fn student(first: &str, email: &str, class: &str) -> Student {
    Student {
        id: None,
        first_name: first.into(),
        last_name: "Pupil".into(),
        email: email.into(),
        class: class.into(),
    }
}

/// Insert records directly, bypassing the service layer; returns the stored copies
pub async fn seed<R: Record>(store: &dyn Store, records: &[R]) -> Vec<R> {
    let descriptor = R::descriptor();
    let mut tx = store.begin().await.unwrap();
    let mut stored = Vec::new();
    for record in records {
        let id = tx.insert(descriptor.schema(), &descriptor.values(record)).await.unwrap();
        stored.push(descriptor.from_row(descriptor.to_row(id, record)).unwrap());
    }
    tx.commit().await.unwrap();
    stored
}

/// Read every record of `R` in identifier order
pub async fn snapshot<R: Record>(store: &dyn Store) -> Vec<R> {
    let descriptor = R::descriptor();
    let mut tx = store.begin().await.unwrap();
    let rows = tx.select(descriptor.schema(), &ListFilter::default()).await.unwrap();
    rows.into_iter().map(|row| descriptor.from_row(row).unwrap()).collect()
}

pub fn entries(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| item.as_object().cloned().unwrap_or_default())
            .collect(),
        other => vec![other.as_object().cloned().unwrap_or_default()],
    }
}

/// `{"id": "<n>", ...updates}`
pub fn patch_entry(id: i64, updates: Value) -> Value {
    let mut entry = updates.as_object().cloned().unwrap_or_default();
    entry.insert("id".into(), json!(id.to_string()));
    Value::Object(entry)
}
