//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::features::ValidationError;
use crate::model::PipelineError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Input errors
    MalformedBody(String),
    Validation(ValidationError),

    // Model state errors
    ModelUnavailable,
    MetadataUnavailable,

    // Inference errors
    Prediction(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MalformedBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Invalid input".to_string()),
            AppError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model not loaded. Please check server logs.".to_string(),
            ),
            AppError::MetadataUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Model metadata not available".to_string())
            }
            AppError::Prediction(msg) => {
                tracing::error!("Prediction error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction error: {}", msg))
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = match &self {
            AppError::Validation(err) => json!({
                "error": error_message,
                "status": status.as_u16(),
                "violations": err.violations,
            }),
            _ => json!({
                "error": error_message,
                "status": status.as_u16()
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ModelUnavailable => AppError::ModelUnavailable,
            PipelineError::MetadataUnavailable => AppError::MetadataUnavailable,
            PipelineError::Inference(msg) => AppError::Prediction(msg),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inference_failure_reaches_response() {
        let err = AppError::from(PipelineError::Inference("failed to load preprocessor".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Prediction error: failed to load preprocessor");
        assert_eq!(body["status"], 500);
    }
}
