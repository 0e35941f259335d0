//! HTTP handlers for the FPL indexer API.
//!
//! This module contains all route handlers organized by domain.

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod health;
pub mod index;

pub use health::{api_health, health_check};

/// Build the API routes.
pub fn routes(state: AppState) -> Router {
    // Health check routes
    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(api_health))
        .with_state(state.clone());

    // Indexing routes
    let index_routes = Router::new()
        .route("/index/orchestrate", post(index::orchestrate))
        .route("/index/run/{execution_id}", post(index::run))
        .route("/index/status/{execution_id}", get(index::status))
        .with_state(state);

    Router::new().merge(health_routes).merge(index_routes)
}
