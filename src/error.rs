//! Error types for the enrichment pipeline and the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Failures that abort a pipeline run.
///
/// Rule-level problems inside a single alert never surface here; they are
/// skipped where they occur. `Clone` so one failed refresh can be handed to
/// every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// An upstream call failed or returned data we could not read.
    #[error("upstream error ({source_name}): {message}")]
    Upstream {
        source_name: String,
        message: String,
    },

    /// The primary payload is not a valid GTFS-Realtime message.
    #[error("decode error: {0}")]
    Decode(String),

    /// The in-flight refresh went away without reporting a result.
    #[error("refresh aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    pub fn upstream(source_name: &str, message: impl ToString) -> Self {
        PipelineError::Upstream {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown alert type")]
    UnknownAlertType,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownAlertType => StatusCode::NOT_FOUND,
            ApiError::Pipeline(err) => {
                tracing::error!(target: "api", error = %err, "alert feed unavailable");
                StatusCode::BAD_GATEWAY
            }
        };

        let body = serde_json::json!({
            "error": true,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
