//! Auto-staging tower: control-plane API for repositories and their
//! per-branch environments.
//!
//! The tower owns the records and validates every lifecycle change. The
//! Builder provisions and tears down infrastructure; the Scheduler starts and
//! stops environments. Both are reached through actor invocations.

mod actors;
mod config;
mod error;
mod events;
mod logging;
mod metrics;
mod migration;
mod models;
mod routes;
mod schema;
mod services;
mod store;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use crate::actors::http::HttpInvoker;
use crate::services::lifecycle::Lifecycle;
use crate::store::postgres::PgStore;
use crate::store::Stores;

#[derive(Parser)]
#[command(name = "tower", about = "Auto-staging tower control plane")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "TOWER_PORT", default_value = "8080")]
    port: u16,

    /// PostgreSQL connection URL; the in-memory store is used when unset
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Stage keying the global repository defaults and tower configuration
    #[arg(long, env = "TOWER_STAGE", default_value = "prod")]
    stage: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = logging::init();
    let cli = Cli::parse();

    tracing::info!("Starting tower...");

    let tower_config = config::TowerConfig::from_env();

    let stores = match &cli.database_url {
        Some(url) => {
            let store = PgStore::connect(url, tower_config.db_max_connections)?;
            tracing::info!("Running tower migration...");
            store.migrate().await?;
            tracing::info!("Tower migration completed.");
            Stores::postgres(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set -- using in-memory store, data is lost on exit");
            Stores::memory()
        }
    };

    let invoker = HttpInvoker::new(
        tower_config.builder_url.clone(),
        tower_config.scheduler_url.clone(),
        tower_config.actor_timeout,
    )?;
    let lifecycle = Lifecycle::new(stores, Arc::new(invoker), cli.stage);

    // Apply the stored log level for this stage
    match lifecycle.tower_config().await {
        Ok(stored) => {
            if let Err(e) = log_level.apply(&stored) {
                tracing::warn!("Failed to apply stored log level: {e}");
            }
        }
        Err(e) => tracing::warn!("Failed to read tower configuration: {e}"),
    }

    let state = routes::TowerRouterState {
        lifecycle,
        config: tower_config,
        log_level: Some(log_level),
    };
    let app = routes::tower_router(state);

    // Initialize metrics
    metrics::init_metrics();

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Tower listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
