//! HTTP API layer with Axum routes.
//!
//! This crate exposes the ledger engine to upstream business modules
//! (sales, purchases, payments) as a service boundary:
//! - Journal entry lifecycle (create, post, cancel, reverse)
//! - Chart of accounts management, balances, reconciliation
//! - Document number allocation and preview

pub mod error;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use saldo_shared::config::LedgerConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DatabaseConnection,
    /// Engine tuning (retry bounds for contended rows).
    pub ledger: LedgerConfig,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
