use std::sync::Arc;

use axum::{body::Bytes, Router};
use serde_json::{Map, Value};

use crate::{ApiError, Config, LlmClient, ReportStore};

mod health;
mod llm;
mod query;
mod stats;
mod submit;

#[cfg(test)]
pub(crate) mod test_support;

// ---

/// Per-request dependencies shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub llm: LlmClient,
}

pub fn router(store: Arc<dyn ReportStore>, llm: LlmClient, config: &Config) -> Router {
    // ---
    let mut app = Router::new()
        .merge(submit::router())
        .merge(stats::router())
        .merge(llm::router())
        .merge(health::router());

    if config.enable_raw_query {
        app = app.merge(query::router());
    }

    app.with_state(AppState { store, llm })
}

/// Parse a request body into a non-empty JSON object.
///
/// Empty bodies, malformed JSON, non-objects and `{}` all yield `None`.
fn json_object(body: &Bytes) -> Option<Map<String, Value>> {
    // ---
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

fn missing_body() -> ApiError {
    ApiError::validation("Missing JSON body")
}
