use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row as _, Transaction};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::{bind_value, QueryBuilder};
use crate::database::store::{Row, Store, StoreTx, TableSchema};
use crate::filter::ListFilter;
use crate::record::{FieldKind, FieldValue, IDENTIFIER_KEY};

#[derive(Debug, Clone, Copy)]
struct QueryLogging {
    enabled: bool,
    slow_threshold_ms: Option<u64>,
}

impl QueryLogging {
    fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            enabled: config.enable_query_logging,
            slow_threshold_ms: config
                .enable_slow_query_warning
                .then_some(config.slow_query_threshold_ms),
        }
    }

    fn started(&self, sql: &str) -> Instant {
        if self.enabled {
            debug!(sql, "executing query");
        }
        Instant::now()
    }

    fn finished(&self, sql: &str, started: Instant) {
        let elapsed = started.elapsed().as_millis() as u64;
        if let Some(threshold) = self.slow_threshold_ms {
            if elapsed > threshold {
                warn!(sql, elapsed_ms = elapsed, "slow query");
            }
        }
    }
}

/// Postgres-backed [`Store`]
pub struct PgStore {
    pool: PgPool,
    logging: QueryLogging,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(config).await?;
        Ok(Self { pool, logging: QueryLogging::from_config(config) })
    }

    pub async fn close(&self) {
        DatabaseManager::close(&self.pool).await;
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx, logging: self.logging }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn migrate(&self, tables: &[&TableSchema]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for table in tables {
            let sql = QueryBuilder::new(table).create_table();
            debug!(sql = %sql, "migrating");
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("Migrated {} tables", tables.len());
        Ok(())
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
    logging: QueryLogging,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn select(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError> {
        let sql = QueryBuilder::new(table).select(filter);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_value(q, p);
        }
        let started = self.logging.started(&sql.query);
        let rows = q.fetch_all(&mut *self.tx).await?;
        self.logging.finished(&sql.query, started);
        rows.iter().map(|r| decode_row(table, r)).collect()
    }

    async fn count(&mut self, table: &TableSchema, filter: &ListFilter) -> Result<i64, DatabaseError> {
        let sql = QueryBuilder::new(table).count(filter);
        let mut q = sqlx::query(&sql.query);
        for p in &sql.params {
            q = bind_value(q, p);
        }
        let started = self.logging.started(&sql.query);
        let row = q.fetch_one(&mut *self.tx).await?;
        self.logging.finished(&sql.query, started);
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn fetch(&mut self, table: &TableSchema, id: i64) -> Result<Option<Row>, DatabaseError> {
        let sql = QueryBuilder::new(table).fetch();
        let started = self.logging.started(&sql);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *self.tx).await?;
        self.logging.finished(&sql, started);
        row.map(|r| decode_row(table, &r)).transpose()
    }

    async fn insert(&mut self, table: &TableSchema, values: &[FieldValue]) -> Result<i64, DatabaseError> {
        let sql = QueryBuilder::new(table).insert();
        let mut q = sqlx::query(&sql);
        for v in values {
            q = bind_value(q, v);
        }
        let started = self.logging.started(&sql);
        let row = q.fetch_one(&mut *self.tx).await?;
        self.logging.finished(&sql, started);
        let id: i64 = row.try_get(IDENTIFIER_KEY)?;
        Ok(id)
    }

    async fn update(&mut self, table: &TableSchema, row: &Row) -> Result<u64, DatabaseError> {
        let sql = QueryBuilder::new(table).update();
        let mut q = sqlx::query(&sql);
        for v in &row.values {
            q = bind_value(q, v);
        }
        let started = self.logging.started(&sql);
        let result = q.bind(row.id).execute(&mut *self.tx).await?;
        self.logging.finished(&sql, started);
        Ok(result.rows_affected())
    }

    async fn delete(&mut self, table: &TableSchema, id: i64) -> Result<u64, DatabaseError> {
        let sql = QueryBuilder::new(table).delete();
        let started = self.logging.started(&sql);
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        self.logging.finished(&sql, started);
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn decode_row(table: &TableSchema, row: &PgRow) -> Result<Row, DatabaseError> {
    let id: i64 = row.try_get(IDENTIFIER_KEY)?;
    let mut values = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let value = match column.kind {
            FieldKind::Identifier => FieldValue::Integer(row.try_get(column.name)?),
            FieldKind::Text => FieldValue::Text(row.try_get(column.name)?),
            FieldKind::Bool => FieldValue::Bool(row.try_get(column.name)?),
            FieldKind::NullableText => FieldValue::NullableText(row.try_get(column.name)?),
        };
        values.push(value);
    }
    Ok(Row { id, values })
}
