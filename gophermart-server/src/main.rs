//! Gophermart Server
//!
//! Loyalty points backend: users upload order numbers, the accrual engine
//! collects the reward for each one, and users spend the points.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use anyhow::Context;
use clap::Parser;
use config::{CliSettings, ConfigLoader};
use gophermart_core::accrual::HttpAccrualClient;
use gophermart_core::processors::AccrualEngine;
use gophermart_core::store::{BonusStore, MemoryStore, PgStore};
use gophermart_sdk::session::SessionKey;
use server::{build_router, run_server};
use shutdown::spawn_signal_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Gophermart - loyalty points service
#[derive(Parser, Debug)]
#[command(name = "gophermart-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address the HTTP server listens on
    #[arg(short = 'a', long, env = "RUN_ADDRESS", default_value = "0.0.0.0:8080")]
    run_address: String,

    /// Postgres connection string; without it everything lives in memory
    #[arg(short = 'd', long, env = "DATABASE_URI")]
    database_uri: Option<String>,

    /// Base address of the accrual service
    #[arg(short = 'r', long, env = "ACCRUAL_SYSTEM_ADDRESS")]
    accrual_address: String,

    /// Optional TOML file tuning the engine and sessions
    #[arg(short, long, env = "GOPHERMART_CONFIG")]
    config: Option<PathBuf>,

    /// Do not apply database migrations on startup
    #[arg(long, default_value = "false")]
    skip_migrations: bool,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting gophermart-server v{}", env!("CARGO_PKG_VERSION"));

    let loader = ConfigLoader::new(args.config.as_ref());
    let config = loader
        .load(CliSettings {
            run_address: args.run_address,
            database_uri: args.database_uri,
            accrual_address: args.accrual_address,
            skip_migrations: args.skip_migrations,
        })
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;

    let mut pool = None;
    let store: Arc<dyn BonusStore> = match &config.database_uri {
        Some(uri) => {
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(uri)
                .await
                .context("failed to connect to database")?;
            tracing::info!("Database connection established");

            let store = PgStore::new(db_pool);
            if config.run_migrations {
                tracing::info!("Running database migrations...");
                store.migrate().await.context("failed to run migrations")?;
                tracing::info!("Migrations completed successfully");
            }
            pool = Some(store.pool().clone());
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URI is not set, keeping all data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let lookup = HttpAccrualClient::new(
        config.accrual_address.clone(),
        config.engine.request_timeout,
    )
    .context("invalid accrual system address")?;
    tracing::info!(accrual = %config.accrual_address, "Accrual client ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx.clone());

    let engine = AccrualEngine::new(store.clone(), Arc::new(lookup), config.engine);
    let engine_stop = shutdown_tx.clone();
    let engine_task = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            let result = engine.run(shutdown_rx).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Accrual engine stopped, shutting down");
            }
            let _ = engine_stop.send(true);
            result
        }
    });

    let sessions = SessionKey::new(&config.session_secret, config.session_ttl);
    let router = build_router(AppState::new(store, sessions));

    tracing::info!("Starting HTTP server on {}", config.run_address);
    let served = run_server(router, &config.run_address, shutdown_rx).await;

    // Stop the engine whatever ended the server.
    let _ = shutdown_tx.send(true);
    let engine_result = engine_task.await;

    if let Some(pool) = pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    served.context("HTTP server failed")?;
    engine_result
        .context("accrual engine task panicked")?
        .context("accrual engine failed")?;
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
