// src/routes/health.rs
//! Health check endpoint for the building reports backend.
//!
//! Used by container orchestrators and CI pipelines to verify that the service
//! is running and can reach its database. Sibling module in the `routes`
//! directory following the Explicit Module Boundary Pattern (EMBP): the
//! gateway (`mod.rs`) merges the subrouter exported here.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    llm_mode: &'static str,
}

/// Handle `GET /health`.
///
/// Returns 200 when a trivial query succeeds and 503 otherwise. Never calls
/// the completion service; `llm_mode` only reports how `/api/llm` will behave.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    let llm_mode = state.llm.mode_name();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "up",
                llm_mode,
            }),
        ),
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "down",
                    llm_mode,
                }),
            )
        }
    }
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
