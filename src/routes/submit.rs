use axum::{
    body::Bytes, extract::State, http::StatusCode, response::IntoResponse, routing::post, Json,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{json_object, missing_body, AppState};
use crate::{ApiError, InsertedReport, ReportSubmission};

// ---

#[derive(Serialize)]
struct SubmitResponse {
    success: bool,
    inserted: InsertedReport,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/submit", post(handler))
}

/// Handle `POST /api/submit`: validate one report and insert it.
///
/// Validation happens entirely before storage is touched, so a 400 never
/// leaves a row behind.
async fn handler(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    // ---
    let object = json_object(&body).ok_or_else(missing_body)?;
    let submission: ReportSubmission =
        serde_json::from_value(Value::Object(object)).map_err(|_| missing_body())?;
    let report = submission.validate()?;

    debug!(
        "POST /api/submit - inserting report for {} on {}",
        report.building_name, report.report_date
    );

    let inserted = state.store.insert_report(&report).await?;

    info!(
        "Stored report {} for {} ({})",
        inserted.id, report.building_name, report.report_date
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            inserted,
        }),
    ))
}
