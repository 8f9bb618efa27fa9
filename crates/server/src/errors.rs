use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use concierge::PipelineError;
use serde_json::json;
use tracing::{error, warn};

/// Returned for every pipeline failure; details only go to the log.
pub const PIPELINE_FAILURE_MESSAGE: &str = "The support agent could not answer this query.";

/// A custom error type for the server application.
///
/// Each variant maps to an HTTP status and a JSON `{"error": ...}` body.
#[derive(Debug)]
pub enum AppError {
    /// A query that failed somewhere in the pipeline.
    Pipeline(PipelineError),
    /// A lookup that matched nothing.
    NotFound(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Pipeline(err) => {
                // Log the original error for debugging purposes
                error!(retryable = err.is_retryable(), "PipelineError: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    PIPELINE_FAILURE_MESSAGE.to_string(),
                )
            }
            AppError::NotFound(message) => {
                warn!("Not found: {message}");
                (StatusCode::NOT_FOUND, message)
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
