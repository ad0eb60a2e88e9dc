//! Ledger Engine
//!
//! Loads configuration, connects storage and runs the fee notification relay
//! until Ctrl-C.
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│ Storage  │───▶│ Outbox Relay │───▶│ LogSink  │
//! │  (YAML)  │    │ (PG/mem) │    │   (scan)     │    │          │
//! └──────────┘    └──────────┘    └──────────────┘    └──────────┘
//! ```

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;

use ledger_engine::config::AppConfig;
use ledger_engine::db::{Database, schema};
use ledger_engine::notification::LogSink;
use ledger_engine::store::{Backend, MemoryStore, PgStore};
use ledger_engine::{LedgerService, logging};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = logging::init_logging(&app_config);

    tracing::info!("Starting ledger engine in {} mode", env);

    match &app_config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.health_check().await.context("PostgreSQL health check")?;
            schema::init_schema(db.pool()).await?;
            run(Arc::new(PgStore::new(db.into_pool())), &app_config).await
        }
        None => {
            tracing::warn!("No postgres_url configured, using in-memory store");
            run(Arc::new(MemoryStore::new()), &app_config).await
        }
    }
}

async fn run<B: Backend + 'static>(backend: Arc<B>, config: &AppConfig) -> anyhow::Result<()> {
    let service = LedgerService::new(
        backend,
        Arc::new(LogSink),
        &config.ledger,
        config.relay.clone(),
    )
    .context("Invalid ledger configuration")?;

    tracing::info!(
        fee = ?service.coordinator.policy().fee.map(|f| f.to_string()),
        allow_negative_balance = service.coordinator.policy().allow_negative_balance,
        "Ledger ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = service.relay.clone();
    let relay_handle = tokio::spawn(async move { relay.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    // Receiver may already be gone if the relay exited on its own
    let _ = shutdown_tx.send(true);
    relay_handle.await.context("Outbox relay task panicked")?;

    tracing::info!("Ledger engine stopped");
    Ok(())
}
