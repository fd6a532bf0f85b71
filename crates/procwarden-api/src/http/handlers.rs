//! Daemon API handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use procwarden_daemon::Daemon;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Fields accepted when creating a daemon.
#[derive(Debug, Default, Deserialize)]
pub struct CreateDaemonRequest {
    /// Daemon key; generated when absent or empty.
    #[serde(default)]
    pub key: Option<String>,

    /// Command line to run.
    #[serde(default)]
    pub cmd: String,

    /// Working directory; the server's own when absent or empty.
    #[serde(default)]
    pub dir: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// List all daemons.
///
/// GET /
pub async fn list_daemons(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Daemon>>, ApiError> {
    Ok(Json(state.manager.list().await?))
}

/// Create a daemon from form fields or a JSON body.
///
/// POST /
pub async fn create_daemon(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Daemon>, ApiError> {
    let body = if is_json(&request) {
        let Json(body) = Json::<CreateDaemonRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body
    } else {
        let Form(body) = Form::<CreateDaemonRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body
    };

    if body.cmd.trim().is_empty() {
        return Err(ApiError::BadRequest("cmd required".to_string()));
    }

    info!("Creating daemon: {}", body.cmd);
    let daemon = state
        .manager
        .create(
            non_empty(body.key),
            body.cmd,
            non_empty(body.dir).map(PathBuf::from),
        )
        .await?;
    Ok(Json(daemon))
}

/// Get one daemon.
///
/// GET /{key}
pub async fn get_daemon(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Daemon>, ApiError> {
    Ok(Json(state.manager.get(&key).await?))
}

/// ANY /{key}/start
pub async fn start_daemon(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.manager.start(&key).await?;
    Ok(Json(json!({})))
}

/// ANY /{key}/stop
pub async fn stop_daemon(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.manager.stop(&key).await?;
    Ok(Json(json!({})))
}

/// ANY /{key}/continue
pub async fn continue_daemon(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.manager.continue_daemon(&key).await?;
    Ok(Json(json!({})))
}

/// ANY /{key}/kill
pub async fn kill_daemon(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.manager.kill(&key).await?;
    Ok(Json(json!({})))
}

/// Liveness probe.
///
/// GET /healthz
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime().as_secs(),
        "live_processes": state.manager.live_processes(),
    }))
}
