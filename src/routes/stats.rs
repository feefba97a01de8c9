use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::{ApiError, BuildingStats};

// ---

#[derive(Serialize)]
struct StatsResponse {
    success: bool,
    stats: Vec<BuildingStats>,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/stats", get(handler))
}

/// Handle `GET /api/stats`: one aggregation over every report, no caching.
async fn handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    // ---
    let stats = state.store.building_stats().await?;
    info!("GET /api/stats - {} buildings", stats.len());

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

#[cfg(test)]
mod tests {
    // ---
    use crate::routes::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_single_report_without_satisfaction() {
        // ---
        let app = TestApp::new();
        app.post("/api/submit", json!({ "buildingName": "Base A", "date": "2024-01-15" }))
            .await;

        let (status, json) = app.get("/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let base_a = &json["stats"][0];
        assert_eq!(base_a["building_name"], "Base A");
        assert_eq!(base_a["total_reports"], 1);
        assert_eq!(base_a["avg_satisfaction"], Value::Null);
        assert_eq!(base_a["last_report_date"], "2024-01-15");
    }

    #[tokio::test]
    async fn test_latest_date_wins_and_average_skips_absent() {
        // ---
        let app = TestApp::new();
        app.post(
            "/api/submit",
            json!({ "buildingName": "Base A", "date": "2024-01-20", "fuel": 80 }),
        )
        .await;
        app.post(
            "/api/submit",
            json!({ "buildingName": "Base A", "date": "2024-01-10", "fuel": 50, "satisfaction": 7 }),
        )
        .await;
        app.post(
            "/api/submit",
            json!({ "buildingName": "Base A", "date": "2024-01-12", "satisfaction": "8" }),
        )
        .await;

        let (_, json) = app.get("/api/stats").await;
        let base_a = &json["stats"][0];

        assert_eq!(base_a["fuel"], "80");
        assert_eq!(base_a["avg_satisfaction"], 7.5);
        assert_eq!(base_a["last_report_date"], "2024-01-20");
        assert_eq!(base_a["total_reports"], 3);
    }

    #[tokio::test]
    async fn test_same_date_tie_goes_to_latest_insert() {
        // ---
        let app = TestApp::new();
        for fuel in [1, 2] {
            app.post(
                "/api/submit",
                json!({ "buildingName": "Base A", "date": "2024-01-20", "fuel": fuel }),
            )
            .await;
        }

        let (_, json) = app.get("/api/stats").await;
        assert_eq!(json["stats"][0]["fuel"], "2");
        assert_eq!(json["stats"][0]["total_reports"], 2);
    }

    #[tokio::test]
    async fn test_average_is_rounded_to_two_decimals() {
        // ---
        let app = TestApp::new();
        for (date, satisfaction) in [("2024-01-01", 7), ("2024-01-02", 8), ("2024-01-03", 8)] {
            app.post(
                "/api/submit",
                json!({ "buildingName": "Base A", "date": date, "satisfaction": satisfaction }),
            )
            .await;
        }

        let (_, json) = app.get("/api/stats").await;
        assert_eq!(json["stats"][0]["avg_satisfaction"], 7.67);
    }

    #[tokio::test]
    async fn test_buildings_are_ordered_by_name() {
        // ---
        let app = TestApp::new();
        for name in ["Charlie", "Alpha", "Bravo"] {
            app.post("/api/submit", json!({ "buildingName": name, "date": "2024-03-01" }))
                .await;
        }

        let (_, json) = app.get("/api/stats").await;
        let names: Vec<&str> = json["stats"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["building_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Alpha", "Bravo", "Charlie"]);
    }

    #[tokio::test]
    async fn test_empty_table() {
        // ---
        let app = TestApp::new();
        let (status, json) = app.get("/api/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "success": true, "stats": [] }));
    }

    #[tokio::test]
    async fn test_storage_failure() {
        // ---
        let app = TestApp::failing();
        let (status, json) = app.get("/api/stats").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("Database error"));
    }
}
