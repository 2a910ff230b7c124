use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

const UNIQUE_VIOLATION: &str = "23505";

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    /// A unique column already holds the value being written
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let detail = db.constraint().unwrap_or(db.message()).to_string();
                return DatabaseError::Duplicate(detail);
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Builds the Postgres connection pool from configuration
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::connection_string(config, |key| std::env::var(key).ok())?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&connection_string)
            .await?;

        info!("Created database pool (max_connections={})", config.max_connections);
        Ok(pool)
    }

    /// `database.url` when set, otherwise `postgres://DB_USER:DB_PASSWORD@DB_HOST:DB_PORT/DB_NAME`
    fn connection_string(
        config: &DatabaseConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, DatabaseError> {
        if let Some(base) = &config.url {
            let url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
            return Ok(url.into());
        }

        let name = lookup("DB_NAME").ok_or(DatabaseError::ConfigMissing("DATABASE_URL or DB_NAME"))?;
        let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string());
        let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());

        let mut url = url::Url::parse(&format!("postgres://{}:{}", host, port))
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if let Some(user) = lookup("DB_USER") {
            url.set_username(&user).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            url.set_password(Some(&password)).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        url.set_path(&format!("/{}", name));
        Ok(url.into())
    }

    pub async fn close(pool: &PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }
}
