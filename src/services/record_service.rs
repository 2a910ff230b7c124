use std::marker::PhantomData;
use std::time::Duration;

use tokio::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::config;
use crate::database::{SharedStore, StoreTx};
use crate::filter::{Filter, ListFilter};
use crate::record::{
    apply_patch, build_record, parse_batch, parse_object, validate_fields, FieldValue, IdentifierPolicy,
    Record, RecordError,
};

use super::batch::{apply_batch, delete_many};
use super::{begin_within, settle, ServiceError};

/// CRUD operations for one record type over a shared store.
///
/// Every operation runs in its own transaction under the configured
/// deadline. Payload validation happens before the store is touched.
pub struct RecordService<R> {
    store: SharedStore,
    timeout: Duration,
    _record: PhantomData<R>,
}

impl<R: Record> RecordService<R> {
    pub fn new(store: SharedStore) -> Self {
        Self::with_timeout(store, config().database.transaction_timeout())
    }

    pub fn with_timeout(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout, _record: PhantomData }
    }

    pub async fn list(&self, params: &[(String, String)]) -> Result<Vec<R>, ServiceError> {
        let filter = Filter::from_params(R::descriptor(), params)?;
        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, select::<R>(tx.as_mut(), &filter)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }

    pub async fn get(&self, id: i64) -> Result<R, ServiceError> {
        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, fetch::<R>(tx.as_mut(), id)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }

    /// Insert every element of a JSON array; ids are assigned by storage
    pub async fn create_many(&self, payload: Value) -> Result<Vec<R>, ServiceError> {
        let entries = parse_batch(payload)?;
        validate_fields(&entries, R::descriptor(), IdentifierPolicy::Rejected)?;
        let records = entries
            .iter()
            .map(build_record::<R>)
            .collect::<Result<Vec<R>, RecordError>>()?;

        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, insert_all(tx.as_mut(), records)).await;
        let created = settle(tx, outcome, self.timeout, ServiceError::Timeout).await?;
        info!("Created {} {} record(s)", created.len(), R::LABEL);
        Ok(created)
    }

    /// Overwrite every field of one record
    pub async fn replace(&self, id: i64, payload: Value) -> Result<R, ServiceError> {
        let values = parse_object(payload)?;
        validate_fields(std::slice::from_ref(&values), R::descriptor(), IdentifierPolicy::Rejected)?;
        let record = build_record::<R>(&values)?;

        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, write_back(tx.as_mut(), id, record)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }

    /// Patch the named fields of one record
    pub async fn patch_one(&self, id: i64, payload: Value) -> Result<R, ServiceError> {
        let updates = parse_object(payload)?;
        validate_fields(std::slice::from_ref(&updates), R::descriptor(), IdentifierPolicy::Allowed)?;

        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, patch::<R>(tx.as_mut(), id, &updates)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }

    /// Patch many records atomically from `[{"id": "<n>", ...}, ...]`
    pub async fn patch_many(&self, payload: Value) -> Result<Vec<R>, ServiceError> {
        let entries = parse_batch(payload)?;
        validate_fields(&entries, R::descriptor(), IdentifierPolicy::Allowed)?;
        let patched = apply_batch::<R>(self.store.as_ref(), &entries, self.timeout).await?;
        info!("Patched {} {} record(s)", patched.len(), R::LABEL);
        Ok(patched)
    }

    /// Delete many records atomically from a JSON array of integer ids
    pub async fn delete_many(&self, payload: Value) -> Result<Vec<i64>, ServiceError> {
        let ids: Vec<i64> = serde_json::from_value(payload)
            .map_err(|_| RecordError::InvalidJson("expected an array of integer ids".to_string()))?;
        let deleted = delete_many::<R>(self.store.as_ref(), &ids, self.timeout).await?;
        info!("Deleted {} {} record(s)", deleted.len(), R::LABEL);
        Ok(deleted)
    }

    pub async fn delete_one(&self, id: i64) -> Result<i64, ServiceError> {
        let expires = Instant::now() + self.timeout;
        let mut tx = begin_within(self.store.as_ref(), expires, self.timeout, ServiceError::Timeout).await?;
        let outcome = tokio::time::timeout_at(expires, remove::<R>(tx.as_mut(), id)).await;
        settle(tx, outcome, self.timeout, ServiceError::Timeout).await
    }
}

pub(crate) async fn select<R: Record>(tx: &mut dyn StoreTx, filter: &ListFilter) -> Result<Vec<R>, ServiceError> {
    let descriptor = R::descriptor();
    let rows = tx.select(descriptor.schema(), filter).await?;
    debug!(table = descriptor.table(), rows = rows.len(), "selected");
    rows.into_iter()
        .map(|row| descriptor.from_row(row).map_err(ServiceError::from))
        .collect()
}

pub(crate) async fn fetch<R: Record>(tx: &mut dyn StoreTx, id: i64) -> Result<R, ServiceError> {
    let descriptor = R::descriptor();
    let row = tx
        .fetch(descriptor.schema(), id)
        .await?
        .ok_or(ServiceError::NotFound { label: R::LABEL, id })?;
    Ok(descriptor.from_row(row)?)
}

async fn insert_all<R: Record>(tx: &mut dyn StoreTx, records: Vec<R>) -> Result<Vec<R>, ServiceError> {
    let descriptor = R::descriptor();
    let mut created = Vec::with_capacity(records.len());
    for mut record in records {
        let id = tx.insert(descriptor.schema(), &descriptor.values(&record)).await?;
        descriptor.identifier().write(&mut record, FieldValue::Integer(id))?;
        created.push(record);
    }
    Ok(created)
}

async fn write_back<R: Record>(tx: &mut dyn StoreTx, id: i64, mut record: R) -> Result<R, ServiceError> {
    let descriptor = R::descriptor();
    if tx.update(descriptor.schema(), &descriptor.to_row(id, &record)).await? == 0 {
        return Err(ServiceError::NotFound { label: R::LABEL, id });
    }
    descriptor.identifier().write(&mut record, FieldValue::Integer(id))?;
    Ok(record)
}

async fn patch<R: Record>(tx: &mut dyn StoreTx, id: i64, updates: &Map<String, Value>) -> Result<R, ServiceError> {
    let existing = fetch::<R>(tx, id).await?;
    let record = apply_patch(&existing, updates)?;
    write_back(tx, id, record).await
}

async fn remove<R: Record>(tx: &mut dyn StoreTx, id: i64) -> Result<i64, ServiceError> {
    if tx.delete(R::descriptor().schema(), id).await? == 0 {
        return Err(ServiceError::NotFound { label: R::LABEL, id });
    }
    Ok(id)
}
