use std::sync::Arc;

use axum::extract::Path;
use axum::middleware;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerDefaults;
use crate::session::SessionRegistry;
use crate::store::{BalanceStore, SnapshotStore};
use crate::table::{AdminTableView, TableDirectory};

use super::auth::IdentityVerifier;
use super::dto::TableSummary;
use super::error::ApiError;
use super::ws::ws_handler;

/// Shared dependencies for every connection and admin request.
pub struct ServerContext {
    pub sessions: Arc<SessionRegistry>,
    pub directory: Arc<TableDirectory>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub balances: Arc<dyn BalanceStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub defaults: ServerDefaults,
}

pub fn build_router(context: Arc<ServerContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(health))
        .route("/admin/tables", get(list_tables))
        .route("/admin/tables/:table_id", get(inspect_table))
        .layer(Extension(context))
        .layer(middleware::from_fn(super::logging::log_requests))
        .layer(cors)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    tables: usize,
    sessions: usize,
}

async fn health(Extension(ctx): Extension<Arc<ServerContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        tables: ctx.directory.len(),
        sessions: ctx.sessions.len(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TablesResponse {
    count: usize,
    tables: Vec<TableSummary>,
}

async fn list_tables(Extension(ctx): Extension<Arc<ServerContext>>) -> Json<TablesResponse> {
    let tables = ctx.directory.list_summaries().await;
    Json(TablesResponse {
        count: tables.len(),
        tables,
    })
}

async fn inspect_table(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(table_id): Path<String>,
) -> Result<Json<AdminTableView>, ApiError> {
    match ctx.directory.inspect(&table_id).await {
        Some(view) => Ok(Json(view)),
        None => Err(ApiError::NotFound),
    }
}
