use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerDefaults;
use crate::db;
use crate::session::SessionRegistry;
use crate::store::{
    BalanceStore, InMemoryBalanceStore, InMemorySnapshotStore, SeaOrmBalanceStore,
    SeaOrmSnapshotStore, SnapshotStore,
};
use crate::table::TableDirectory;

use super::auth::{DevIdentityVerifier, IdentityVerifier};
use super::routes::{build_router, ServerContext};

const LOG_TARGET: &str = "holdem_server::server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Postgres URL; without one the server runs on in-memory stores.
    pub database_url: Option<String>,
    pub defaults: ServerDefaults,
}

/// Wire the stores, restore snapshotted tables, and build the shared context.
pub async fn build_context(config: &ServerConfig) -> Result<Arc<ServerContext>> {
    let (balances, snapshots): (Arc<dyn BalanceStore>, Arc<dyn SnapshotStore>) =
        match &config.database_url {
            Some(url) => {
                let connection = db::connect(url).await?;
                (
                    Arc::new(SeaOrmBalanceStore::new(connection.clone())),
                    Arc::new(SeaOrmSnapshotStore::new(connection)),
                )
            }
            None => {
                warn!(
                    target: LOG_TARGET,
                    "no database configured; balances and snapshots are in-memory"
                );
                (
                    Arc::new(InMemoryBalanceStore::new(
                        config.defaults.dev_starting_balance,
                    )),
                    Arc::new(InMemorySnapshotStore::new()),
                )
            }
        };

    let directory = TableDirectory::new(
        config.defaults.clone(),
        Arc::clone(&snapshots),
        Arc::clone(&balances),
    );
    let restored = directory.restore_all().await;
    if restored > 0 {
        info!(target: LOG_TARGET, restored, "restored tables from snapshots");
    }

    let sessions = SessionRegistry::new();
    let identity: Arc<dyn IdentityVerifier> = Arc::new(DevIdentityVerifier);

    Ok(Arc::new(ServerContext {
        sessions,
        directory,
        identity,
        balances,
        snapshots,
        defaults: config.defaults.clone(),
    }))
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let context = build_context(&config).await?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    serve(listener, context).await
}

/// Serve on an already-bound listener. Split out so tests can run against an
/// ephemeral port.
pub async fn serve(listener: TcpListener, context: Arc<ServerContext>) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(target: LOG_TARGET, %local_addr, "holdem server listening");

    let router = build_router(context);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
