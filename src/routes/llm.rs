use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{json_object, AppState};
use crate::ApiError;

// ---

#[derive(Serialize)]
struct LlmResponse {
    success: bool,
    response: String,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/llm", post(handler))
}

/// Handle `POST /api/llm`: relay `{"prompt": "..."}` and return the answer text.
async fn handler(State(state): State<AppState>, body: Bytes) -> Result<Json<LlmResponse>, ApiError> {
    // ---
    let prompt = match json_object(&body).as_ref().and_then(|o| o.get("prompt")) {
        Some(Value::String(prompt)) => prompt.clone(),
        _ => return Err(ApiError::validation("Missing prompt in request body")),
    };

    let response = state.llm.complete(&prompt).await?;
    info!(
        "POST /api/llm - answered ({} mode, {} chars)",
        state.llm.mode_name(),
        response.chars().count()
    );

    Ok(Json(LlmResponse {
        success: true,
        response,
    }))
}
