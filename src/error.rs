//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ScoringError>;

/// Failure taxonomy for the scoring pipeline.
///
/// Client mistakes (`NotFound`, `InvalidOverride`) and backend failures
/// (`*Unavailable`) must never be conflated: the former map to 4xx, the
/// latter to 503.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("client {0} not found in feature store")]
    NotFound(i64),

    #[error("invalid override: {0}")]
    InvalidOverride(String),

    #[error("feature store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("model unavailable")]
    ModelUnavailable,

    #[error("explainer unavailable")]
    ExplainerUnavailable,

    #[error("attribution shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ScoringError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ScoringError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Client {} not found", id))
            }
            ScoringError::InvalidOverride(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid request: {}", msg))
            }
            ScoringError::StoreUnavailable(msg) => {
                tracing::error!("Feature store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Feature store unavailable".to_string())
            }
            ScoringError::ModelUnavailable => {
                tracing::error!("Scoring requested while model is unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Model unavailable".to_string())
            }
            ScoringError::ExplainerUnavailable => {
                tracing::error!("Explanation requested while explainer is unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Explainer unavailable".to_string())
            }
            ScoringError::ShapeMismatch(msg) => {
                tracing::error!("Attribution shape mismatch: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Attribution output malformed".to_string())
            }
            ScoringError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
