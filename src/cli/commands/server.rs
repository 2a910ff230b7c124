use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::app::app;
use crate::config::{config, StorageBackend};
use crate::database::models::all_schemas;
use crate::database::{MemoryStore, PgStore, SharedStore};

/// Serve the API until ctrl-c, then drain in-flight requests and close the pool
pub async fn handle(port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    let config = config();
    info!("Starting roster API in {:?} mode", config.environment);

    let mut postgres = None;
    let store: SharedStore = if memory || config.database.backend == StorageBackend::Memory {
        info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let pg = Arc::new(PgStore::connect(&config.database).await?);
        postgres = Some(pg.clone());
        pg
    };

    store.migrate(&all_schemas()).await?;

    let port = port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Roster API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app(store, config).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(pg) = postgres {
        pg.close().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
