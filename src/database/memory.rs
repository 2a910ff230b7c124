use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::store::{Row, Store, StoreTx, TableSchema};
use crate::filter::{FilterOrder, FilterWhere, ListFilter};
use crate::record::FieldValue;

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Vec<FieldValue>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: HashMap<&'static str, MemoryTable>,
}

impl MemoryState {
    fn table(&mut self, schema: &TableSchema) -> &mut MemoryTable {
        self.tables.entry(schema.name).or_insert_with(|| MemoryTable { next_id: 1, rows: BTreeMap::new() })
    }
}

/// In-process [`Store`] for tests and `--memory` mode.
///
/// Transactions are serialised: `begin` takes the state lock and works on a
/// copy, `commit` publishes the copy, dropping the transaction discards it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn migrate(&self, tables: &[&TableSchema]) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().await;
        for table in tables {
            state.table(table);
        }
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn check_unique(
        schema: &TableSchema,
        table: &MemoryTable,
        id: Option<i64>,
        values: &[FieldValue],
    ) -> Result<(), DatabaseError> {
        if values.len() != schema.columns.len() {
            return Err(DatabaseError::QueryError(format!(
                "{}: expected {} values, got {}",
                schema.name,
                schema.columns.len(),
                values.len()
            )));
        }
        for (index, column) in schema.columns.iter().enumerate().filter(|(_, c)| c.unique) {
            let clash = table
                .rows
                .iter()
                .any(|(row_id, row)| Some(*row_id) != id && row[index] == values[index]);
            if clash {
                return Err(DatabaseError::Duplicate(format!("{}_{}_key", schema.name, column.name)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn select(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError> {
        let mut rows = Vec::new();
        for (id, values) in &self.working.table(table).rows {
            let row = Row { id: *id, values: values.clone() };
            if FilterWhere::matches(table, &row, &filter.conditions)
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?
            {
                rows.push(row);
            }
        }
        rows.sort_by(|a, b| FilterOrder::compare(table, &filter.order, a, b));
        Ok(rows)
    }

    async fn count(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<i64, DatabaseError> {
        let rows = self.select(table, filter).await?;
        Ok(rows.len() as i64)
    }

    async fn fetch(&mut self, table: &TableSchema, id: i64) -> Result<Option<Row>, DatabaseError> {
        Ok(self
            .working
            .table(table)
            .rows
            .get(&id)
            .map(|values| Row { id, values: values.clone() }))
    }

    async fn insert(&mut self, table: &TableSchema, values: &[FieldValue]) -> Result<i64, DatabaseError> {
        let memory_table = self.working.table(table);
        Self::check_unique(table, memory_table, None, values)?;
        let id = memory_table.next_id;
        memory_table.next_id += 1;
        memory_table.rows.insert(id, values.to_vec());
        debug!(table = table.name, id, "memory insert");
        Ok(id)
    }

    async fn update(&mut self, table: &TableSchema, row: &Row) -> Result<u64, DatabaseError> {
        let memory_table = self.working.table(table);
        if !memory_table.rows.contains_key(&row.id) {
            return Ok(0);
        }
        Self::check_unique(table, memory_table, Some(row.id), &row.values)?;
        memory_table.rows.insert(row.id, row.values.clone());
        Ok(1)
    }

    async fn delete(&mut self, table: &TableSchema, id: i64) -> Result<u64, DatabaseError> {
        Ok(self.working.table(table).rows.remove(&id).map_or(0, |_| 1))
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}
