//! In-memory stand-ins and request helpers for route tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{config, BuildingStats, InsertedReport, JsonRow, LlmClient, NewReport, ReportStore};

// ---

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: i32,
    pub report: NewReport,
}

/// `ReportStore` backed by a vector. With `fail` set every call returns a
/// storage error, the way an unreachable database would.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredRow>>,
    raw_queries: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryStore {
    pub fn rows(&self) -> Vec<StoredRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn raw_queries(&self) -> Vec<String> {
        self.raw_queries.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::Protocol("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &NewReport) -> Result<InsertedReport, sqlx::Error> {
        // ---
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i32 + 1;
        rows.push(StoredRow {
            id,
            report: report.clone(),
        });
        Ok(InsertedReport {
            id,
            created_at: Utc::now(),
        })
    }

    async fn building_stats(&self) -> Result<Vec<BuildingStats>, sqlx::Error> {
        // ---
        self.check()?;
        let rows = self.rows.lock().unwrap();

        let mut by_name: BTreeMap<&str, Vec<&StoredRow>> = BTreeMap::new();
        for row in rows.iter() {
            by_name
                .entry(row.report.building_name.as_str())
                .or_default()
                .push(row);
        }

        Ok(by_name
            .into_iter()
            .map(|(name, mut group)| {
                // Latest date first, highest id breaks ties.
                group.sort_by(|a, b| {
                    (b.report.report_date, b.id).cmp(&(a.report.report_date, a.id))
                });
                let latest = &group[0].report;

                let scores: Vec<f64> = group
                    .iter()
                    .filter_map(|r| r.report.satisfaction.map(f64::from))
                    .collect();
                let avg_satisfaction = (!scores.is_empty()).then(|| {
                    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
                    (avg * 100.0).round() / 100.0
                });

                BuildingStats {
                    building_name: name.to_string(),
                    avg_satisfaction,
                    fuel: latest.fuel.clone(),
                    water: latest.water.clone(),
                    provisions: latest.provisions.clone(),
                    last_report_date: Some(latest.report_date),
                    total_reports: group.len() as i64,
                }
            })
            .collect())
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<JsonRow>, sqlx::Error> {
        // ---
        self.check()?;
        self.raw_queries.lock().unwrap().push(sql.to_string());
        let mut row = JsonRow::new();
        row.insert("sql".to_string(), Value::from(sql));
        Ok(vec![row])
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.check()
    }
}

/// Router wired to a [`MemoryStore`], configured from a fake environment.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(&[], false)
    }

    pub fn failing() -> Self {
        Self::build(&[], true)
    }

    pub fn with_env(pairs: &[(&str, &str)]) -> Self {
        Self::build(pairs, false)
    }

    pub fn failing_with_env(pairs: &[(&str, &str)]) -> Self {
        Self::build(pairs, true)
    }

    fn build(pairs: &[(&str, &str)], fail: bool) -> Self {
        // ---
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let cfg = config::load_with(|key| vars.get(key).cloned()).unwrap();

        let store = Arc::new(MemoryStore {
            fail,
            ..MemoryStore::default()
        });
        let router = super::router(store.clone(), LlmClient::from_config(&cfg), &cfg);

        Self { router, store }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        send(&self.router, "GET", path, "").await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, "POST", path, &body.to_string()).await
    }
}

/// Send one request through the router; non-JSON response bodies read as `null`.
pub async fn send(router: &Router, method: &str, path: &str, body: &str) -> (StatusCode, Value) {
    // ---
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(json!(null));

    (status, json)
}
