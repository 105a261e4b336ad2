//! Health check endpoints for orchestration probes.

use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the remote API is reachable before returning OK.
/// Returns 503 Service Unavailable if the API cannot be contacted.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.garge().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness probe failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
