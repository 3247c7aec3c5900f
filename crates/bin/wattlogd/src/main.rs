//! # wattlogd — wattlog daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`wattlog.toml` plus environment overrides)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repositories, the vendor client and the collection job
//! - Schedule periodic collection runs
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod scheduler;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wattlog_adapter_http_axum::state::AppState;
use wattlog_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqliteMeterRepository, SqliteReadingRepository,
};
use wattlog_app::collection::CollectionJob;
use wattlog_app::services::meter_service::MeterService;
use wattlog_app::services::reading_service::ReadingService;

use crate::config::Config;
use crate::telemetry::Telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DatabaseConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let pool = db.pool().clone();

    // Repositories
    let meter_repo = SqliteMeterRepository::new(pool.clone());
    let reading_repo = SqliteReadingRepository::new(pool);

    // Telemetry
    let telemetry =
        Telemetry::from_settings(&config.tuya).context("failed to build vendor client")?;
    if !telemetry.is_enabled() {
        tracing::warn!("vendor credentials missing, collection runs will fail every meter");
    }
    for (device, profile) in config.telemetry.dangling_assignments() {
        tracing::warn!(device, profile, "device assigned to unknown profile, using default");
    }

    // Collection
    let collection_job = Arc::new(CollectionJob::new(
        meter_repo.clone(),
        reading_repo.clone(),
        telemetry,
        config.telemetry.clone(),
        config.collection.collection_config(),
    ));
    if let Some(period) = config.collection.collection_interval() {
        tracing::info!(period_secs = period.as_secs(), "scheduling collection runs");
        tokio::spawn(scheduler::run(Arc::clone(&collection_job), period));
    }
    if config.collection.cron_secret().is_none() {
        tracing::warn!("no cron secret configured, POST /api/collect is disabled");
    }

    // HTTP
    let state = AppState::from_arcs(
        Arc::new(MeterService::new(meter_repo.clone())),
        Arc::new(ReadingService::new(meter_repo, reading_repo)),
        collection_job,
        config.collection.cron_secret().map(str::to_owned),
    );
    let app = wattlog_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("wattlogd listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("wattlogd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
