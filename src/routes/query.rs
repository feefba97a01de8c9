// src/routes/query.rs
//! Arbitrary SQL endpoint.
//!
//! Executes whatever statement the caller sends, verbatim, with the service's
//! own database credentials. There is no validation, no allow-list and no
//! authentication: anyone who can reach this route can read, modify or drop
//! any table. It is only mounted when `ENABLE_RAW_QUERY=true` and shares no
//! code path with `/api/submit`.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{json_object, AppState};
use crate::{ApiError, JsonRow};

// ---

#[derive(Serialize)]
struct QueryResponse {
    success: bool,
    rows: Vec<JsonRow>,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/query", post(handler))
}

/// Handle `POST /api/query` with body `{"sql": "..."}`.
///
/// The statement runs in its own transaction, committed only if it succeeds.
async fn handler(State(state): State<AppState>, body: Bytes) -> Result<Json<QueryResponse>, ApiError> {
    // ---
    let sql = match json_object(&body).as_ref().and_then(|o| o.get("sql")) {
        Some(Value::String(sql)) if !sql.trim().is_empty() => sql.clone(),
        _ => return Err(ApiError::validation("Missing sql in request body")),
    };

    warn!(sql = %sql, "POST /api/query - executing caller-supplied SQL");

    let rows = state.store.run_raw_query(&sql).await?;
    info!("POST /api/query - returned {} rows", rows.len());

    Ok(Json(QueryResponse {
        success: true,
        rows,
    }))
}
