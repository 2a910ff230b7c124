use std::sync::Arc;

use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::filter::ListFilter;
use crate::record::{FieldKind, FieldValue};

/// One non-identifier column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub unique: bool,
}

/// Storage-side shape of a record type, derived from its descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Untyped row: the identifier plus values aligned with `TableSchema::columns`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: i64,
    pub values: Vec<FieldValue>,
}

/// A storage backend. Every mutation happens inside a [`StoreTx`].
#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Create missing tables
    async fn migrate(&self, tables: &[&TableSchema]) -> Result<(), DatabaseError>;
}

/// An open transaction. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait StoreTx: Send {
    async fn select(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError>;

    async fn count(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<i64, DatabaseError>;

    async fn fetch(&mut self, table: &TableSchema, id: i64) -> Result<Option<Row>, DatabaseError>;

    /// Insert one row and return the identifier storage assigned to it
    async fn insert(&mut self, table: &TableSchema, values: &[FieldValue]) -> Result<i64, DatabaseError>;

    /// Overwrite every column of `row.id`; returns affected row count
    async fn update(&mut self, table: &TableSchema, row: &Row) -> Result<u64, DatabaseError>;

    async fn delete(&mut self, table: &TableSchema, id: i64) -> Result<u64, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

pub type SharedStore = Arc<dyn Store>;
