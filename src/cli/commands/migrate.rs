use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::models::all_schemas;
use crate::database::{PgStore, Store};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::connect(&config().database).await?;
    let schemas = all_schemas();
    let outcome = store.migrate(&schemas).await;
    store.close().await;
    outcome?;

    let tables: Vec<&str> = schemas.iter().map(|schema| schema.name).collect();
    output_success(
        output_format,
        &format!("Migrated {} tables", tables.len()),
        Some(json!({ "tables": tables })),
    )
}
