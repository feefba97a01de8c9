//! Data models for building reports and their per-building aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ApiError;

// ---

/// Report body as posted by the frontend.
///
/// Every field is read permissively: wrong JSON types never fail
/// deserialization, they coerce or collapse to `None`. Whether the required
/// fields are actually usable is decided by [`ReportSubmission::validate`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    // ---
    #[serde(default, deserialize_with = "strict_string")]
    pub building_name: Option<String>,
    #[serde(default, deserialize_with = "strict_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub commander_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub photo_caption: Option<String>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub satisfaction: Option<i32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fuel: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub water: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub provisions: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub armament: Option<String>,
    #[serde(default, deserialize_with = "lenient_defibrillators")]
    pub defibrillators: Defibrillators,
    #[serde(default, rename = "previsionJ1", deserialize_with = "lenient_text")]
    pub prevision_j1: Option<String>,
}

/// Nested `defibrillators: { available, total }` object.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Defibrillators {
    // ---
    #[serde(default, deserialize_with = "lenient_integer")]
    pub available: Option<i32>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub total: Option<i32>,
}

/// A validated report, ready for a single INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    // ---
    pub building_name: String,
    pub report_date: NaiveDate,
    pub commander_note: Option<String>,
    pub photo_caption: Option<String>,
    pub satisfaction: Option<i32>,
    pub fuel: Option<String>,
    pub water: Option<String>,
    pub provisions: Option<String>,
    pub armament: Option<String>,
    pub defibrillators_available: Option<i32>,
    pub defibrillators_total: Option<i32>,
    pub prevision_j1: Option<String>,
}

/// Storage-assigned identity of a freshly inserted report.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InsertedReport {
    // ---
    pub id: i32,
    pub created_at: DateTime<Utc>,
}

/// Per-building aggregate, computed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct BuildingStats {
    // ---
    pub building_name: String,
    pub avg_satisfaction: Option<f64>,
    pub fuel: Option<String>,
    pub water: Option<String>,
    pub provisions: Option<String>,
    pub last_report_date: Option<NaiveDate>,
    pub total_reports: i64,
}

impl ReportSubmission {
    /// Check the required fields and produce an insertable report.
    ///
    /// `buildingName` and `date` must be present and non-empty; `date` must
    /// be a calendar date in `YYYY-MM-DD` form.
    pub fn validate(self) -> Result<NewReport, ApiError> {
        // ---
        let (building_name, date) = match (self.building_name, self.date) {
            (Some(name), Some(date)) if !name.is_empty() && !date.is_empty() => (name, date),
            _ => return Err(ApiError::validation("Missing buildingName or date")),
        };

        let report_date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", date))
        })?;

        Ok(NewReport {
            building_name,
            report_date,
            commander_note: self.commander_note,
            photo_caption: self.photo_caption,
            satisfaction: self.satisfaction,
            fuel: self.fuel,
            water: self.water,
            provisions: self.provisions,
            armament: self.armament,
            defibrillators_available: self.defibrillators.available,
            defibrillators_total: self.defibrillators.total,
            prevision_j1: self.prevision_j1,
        })
    }
}

// --- Coercion helpers

/// Render a JSON value as stored text. Numbers keep their JSON spelling.
pub fn coerce_text(value: &Value) -> Option<String> {
    // ---
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Integer coercion: floats truncate, numeric strings parse, booleans are 0/1.
/// Anything unconvertible is `None`, never an error.
pub fn coerce_integer(value: &Value) -> Option<i32> {
    // ---
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).ok()
            } else {
                let f = n.as_f64()?.trunc();
                (f.is_finite() && f >= i32::MIN as f64 && f <= i32::MAX as f64)
                    .then_some(f as i32)
            }
        }
        Value::String(s) => s.trim().parse::<i32>().ok(),
        Value::Bool(b) => Some(i32::from(*b)),
        _ => None,
    }
}

/// Required fields only count when the client actually sent a string.
fn strict_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_text(&Value::deserialize(deserializer)?))
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_integer(&Value::deserialize(deserializer)?))
}

fn lenient_defibrillators<'de, D>(deserializer: D) -> Result<Defibrillators, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => {
            Defibrillators::deserialize(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(Defibrillators::default()),
    }
}
