//! Database schema management for `building-reports`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `building_reports` table that `/api/submit` writes and
/// `/api/stats` aggregates. Safe to call on every startup; no-op if objects
/// already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Rows are insert-only; quantities are kept as the text the client sent.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS building_reports (
            id                       SERIAL      PRIMARY KEY,
            building_name            TEXT        NOT NULL,
            report_date              DATE        NOT NULL,
            commander_note           TEXT,
            photo_caption            TEXT,
            satisfaction             INTEGER,
            fuel                     TEXT,
            water                    TEXT,
            provisions               TEXT,
            armament                 TEXT,
            defibrillators_available INTEGER,
            defibrillators_total     INTEGER,
            prevision_j1             TEXT,
            created_at               TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Serves the per-building "latest value" aggregation
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_building_reports_name_date
            ON building_reports (building_name, report_date DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
