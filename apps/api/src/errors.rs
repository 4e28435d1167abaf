use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::ClassifierError;
use crate::storage::StoreError;

/// Why a pipeline run stopped. Every variant aborts the run; postings the
/// model declined to classify are not errors and never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("classifier failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("document store failed: {0}")]
    Store(#[from] StoreError),

    #[error("invalid input document: {0}")]
    InvalidDocument(String),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "A valid function key is required".to_string(),
            ),
            AppError::Pipeline(PipelineError::InvalidArgument(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg.clone())
            }
            AppError::Pipeline(PipelineError::InvalidDocument(msg)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_DOCUMENT",
                msg.clone(),
            ),
            AppError::Pipeline(PipelineError::Classifier(e)) => {
                tracing::error!("Classifier error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "CLASSIFIER_ERROR",
                    "The classification service failed; no tree was written".to_string(),
                )
            }
            AppError::Pipeline(PipelineError::Store(StoreError::NotFound(name))) => (
                StatusCode::NOT_FOUND,
                "DOCUMENT_NOT_FOUND",
                format!("Document '{name}' not found"),
            ),
            AppError::Pipeline(PipelineError::Store(e)) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_pipeline_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(PipelineError::InvalidArgument("batch size".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                PipelineError::Classifier(ClassifierError::Api {
                    status: 500,
                    message: "boom".into()
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(PipelineError::Store(StoreError::NotFound("jobs.json".into())).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PipelineError::Store(StoreError::Backend("down".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(PipelineError::InvalidDocument("jobs.json: not an array".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
    }
}
