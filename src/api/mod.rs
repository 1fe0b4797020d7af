//! HTTP interface - routes, request handlers, and shared application state
//!
//! Handlers stay thin: they decode requests, call into [`crate::core`], and map the
//! outcome onto status codes. All invariants live in the core.

/// Campaign creation and read-side handlers
pub mod campaigns;
/// Mapping of [`crate::errors::Error`] onto HTTP responses
pub mod error;
/// Code redemption handler
pub mod redemption;

use crate::{config::settings::Settings, errors::Result};
use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared data available to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool for all store operations
    pub database: DatabaseConnection,
    /// Loaded service settings
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Creates a new `AppState` from a connection and settings.
    #[must_use]
    pub const fn new(database: DatabaseConnection, settings: Arc<Settings>) -> Self {
        Self { database, settings }
    }
}

/// `{ "data": ... }` envelope used by successful responses.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    /// Response payload
    pub data: T,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/generate",
            get(campaigns::list_codes).post(campaigns::create_campaign),
        )
        .route("/api/validate", post(redemption::redeem))
        .route("/api/campaigns", get(campaigns::list_campaigns))
        .route("/api/campaigns/:id", get(campaigns::campaign_detail))
        .with_state(state)
}

/// Serves the router on `listener` until Ctrl-C is received.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
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
