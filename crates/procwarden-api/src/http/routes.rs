//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::http::handlers::{
    continue_daemon, create_daemon, get_daemon, health, kill_daemon, list_daemons, start_daemon,
    stop_daemon,
};
use crate::state::AppState;

/// Create the router.
///
/// ## Route Structure
///
/// ```text
/// GET    /                - List daemons
/// POST   /                - Create daemon
/// GET    /{key}           - Get daemon
/// *      /{key}/start     - Start daemon
/// *      /{key}/stop      - Pause daemon
/// *      /{key}/continue  - Resume daemon
/// *      /{key}/kill      - Kill daemon
/// GET    /healthz         - Liveness probe
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_daemons).post(create_daemon))
        .route("/healthz", get(health))
        .route("/{key}", get(get_daemon))
        .route("/{key}/start", any(start_daemon))
        .route("/{key}/stop", any(stop_daemon))
        .route("/{key}/continue", any(continue_daemon))
        .route("/{key}/kill", any(kill_daemon))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
