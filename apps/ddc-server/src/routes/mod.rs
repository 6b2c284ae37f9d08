//! HTTP routes for DDC Server

pub mod health;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().rpc.max_body_bytes;

    Router::new()
        .nest("/health", health::router())
        .merge(crate::rpc::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
