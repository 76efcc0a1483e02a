//! Mapping of orchestrator errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use uuid::Uuid;

use scanhub_core::domain::ScanError;

use crate::application::use_cases::SubmitScanError;
use crate::application::workflow::WorkflowError;
use crate::infrastructure::job_queue::JobQueueError;
use crate::presentation::models::ErrorResponse;

/// Every error a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Scan job {0} not found")]
    NotFound(Uuid),

    #[error("Invalid job id '{0}'")]
    InvalidJobId(String),

    #[error(transparent)]
    Queue(#[from] JobQueueError),

    #[error("{0}")]
    Internal(String),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Validation(message) => ApiError::Validation(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<SubmitScanError> for ApiError {
    fn from(err: SubmitScanError) -> Self {
        match err {
            SubmitScanError::Rejected(err) => err.into(),
            SubmitScanError::Queue(err) => err.into(),
            SubmitScanError::Workflow(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::InvalidJobId(_) => (StatusCode::BAD_REQUEST, "INVALID_JOB_ID"),
            ApiError::Queue(JobQueueError::QueueFull { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_FULL")
            }
            ApiError::Queue(JobQueueError::Closed) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // 4xx = client errors (warn level), 5xx = server errors (error level)
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                http_status = %status,
                error_code = code,
                "Server error mapped to HTTP response"
            );
        } else {
            tracing::warn!(
                error = %self,
                http_status = %status,
                error_code = code,
                "Client error mapped to HTTP response"
            );
        }

        let message = match &self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let details = match &self {
            ApiError::Internal(detail) => Some(serde_json::json!({ "error": detail })),
            _ => None,
        };

        let error_response = ErrorResponse {
            code: code.to_string(),
            message,
            details,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        (status, Json(error_response)).into_response()
    }
}
