//! Report storage.
//!
//! Handlers talk to storage through the [`ReportStore`] trait so the HTTP
//! layer can be exercised without a database. [`PgReportStore`] is the only
//! production implementation; each method issues exactly one statement.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo, ValueRef};

use crate::{BuildingStats, InsertedReport, NewReport};

// ---

/// One result row of an arbitrary query, keyed by column name.
pub type JsonRow = Map<String, Value>;

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert one report atomically and return its generated id and timestamp.
    async fn insert_report(&self, report: &NewReport) -> Result<InsertedReport, sqlx::Error>;

    /// Per-building aggregates ordered by building name.
    async fn building_stats(&self) -> Result<Vec<BuildingStats>, sqlx::Error>;

    /// Execute caller-supplied SQL verbatim and return every row it yields.
    async fn run_raw_query(&self, sql: &str) -> Result<Vec<JsonRow>, sqlx::Error>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert_report(&self, report: &NewReport) -> Result<InsertedReport, sqlx::Error> {
        // ---
        sqlx::query_as::<_, InsertedReport>(
            r#"
            INSERT INTO building_reports (
                building_name, report_date, commander_note, photo_caption,
                satisfaction, fuel, water, provisions, armament,
                defibrillators_available, defibrillators_total, prevision_j1
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, created_at
            "#,
        )
        .bind(&report.building_name)
        .bind(report.report_date)
        .bind(&report.commander_note)
        .bind(&report.photo_caption)
        .bind(report.satisfaction)
        .bind(&report.fuel)
        .bind(&report.water)
        .bind(&report.provisions)
        .bind(&report.armament)
        .bind(report.defibrillators_available)
        .bind(report.defibrillators_total)
        .bind(&report.prevision_j1)
        .fetch_one(&self.pool)
        .await
    }

    async fn building_stats(&self) -> Result<Vec<BuildingStats>, sqlx::Error> {
        // ---
        // Ties on report_date go to the most recently inserted row.
        sqlx::query_as::<_, BuildingStats>(
            r#"
            SELECT
                building_name,
                ROUND(AVG(satisfaction)::numeric, 2)::float8                    AS avg_satisfaction,
                (ARRAY_AGG(fuel       ORDER BY report_date DESC, id DESC))[1] AS fuel,
                (ARRAY_AGG(water      ORDER BY report_date DESC, id DESC))[1] AS water,
                (ARRAY_AGG(provisions ORDER BY report_date DESC, id DESC))[1] AS provisions,
                MAX(report_date)                                                AS last_report_date,
                COUNT(*)                                                        AS total_reports
            FROM building_reports
            GROUP BY building_name
            ORDER BY building_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn run_raw_query(&self, sql: &str) -> Result<Vec<JsonRow>, sqlx::Error> {
        // ---
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on error rolls back whatever the statement did.
        let rows = sqlx::query(sql).fetch_all(&mut *tx).await?;
        let json_rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;
        Ok(json_rows)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }
}

/// Decode every column of a row into JSON by its Postgres type name.
fn row_to_json(row: &PgRow) -> Result<JsonRow, sqlx::Error> {
    // ---
    let mut out = Map::with_capacity(row.columns().len());

    for column in row.columns() {
        let idx = column.ordinal();
        let value = if row.try_get_raw(idx)?.is_null() {
            Value::Null
        } else {
            decode_column(row, idx, column.type_info().name())?
        };
        out.insert(column.name().to_string(), value);
    }

    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    // ---
    let value = match type_name {
        "BOOL" => Value::from(row.try_get::<bool, _>(idx)?),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "FLOAT4" => Value::from(row.try_get::<f32, _>(idx)?),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
        "NUMERIC" => row
            .try_get::<Decimal, _>(idx)?
            .to_f64()
            .map(Value::from)
            .unwrap_or(Value::Null),
        // sqlx reports bpchar as CHAR and the single-byte "char" as "CHAR" quoted.
        "TEXT" | "VARCHAR" | "NAME" | "CHAR" => Value::from(row.try_get::<String, _>(idx)?),
        "\"CHAR\"" => Value::from(char::from(row.try_get::<i8, _>(idx)? as u8).to_string()),
        "DATE" => Value::from(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::from(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string()),
        "TIMESTAMP" => Value::from(
            row.try_get::<chrono::NaiveDateTime, _>(idx)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMPTZ" => Value::from(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx)?
                .to_rfc3339(),
        ),
        "UUID" => Value::from(row.try_get::<uuid::Uuid, _>(idx)?.to_string()),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx)?,
        other => {
            tracing::debug!("No JSON mapping for column type {}, returning null", other);
            Value::Null
        }
    };

    Ok(value)
}
