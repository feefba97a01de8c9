//! Request-level error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Everything a handler can fail with.
///
/// Validation failures are the caller's fault and map to 400; the rest are
/// server-side and map to 500. The body is always `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Required request fields are missing or unusable.
    #[error("{0}")]
    Validation(String),

    /// Connectivity, constraint or query failure in Postgres.
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The completion service answered with a non-success status or an
    /// unusable body. Carries the provider's raw text.
    #[error("Anthropic API error: {0}")]
    Upstream(String),

    /// The completion service could not be reached at all.
    #[error("Completion service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// A credential required by the current mode is absent.
    #[error("{0}")]
    Configuration(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
        } else {
            tracing::warn!(error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
