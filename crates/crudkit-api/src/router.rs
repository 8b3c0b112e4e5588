//! Route definitions for the CrudKit HTTP API.
//!
//! All routes are mounted under `/api`, except the API docs which live at
//! the configured docs path and `/openapi.json`. The router receives
//! `AppState` and passes it to all handlers via Axum's `State` extractor.

use axum::Router;
use axum::routing::get;

use crate::docs::docs_routes;
use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with all routes, without middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .nest(handlers::example::PATH, handlers::example::routes());

    Router::new()
        .nest("/api", api_routes)
        .merge(docs_routes(&state.config))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Liveness and storage reachability
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
