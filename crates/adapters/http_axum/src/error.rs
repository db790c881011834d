//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightsync_domain::error::{SyncError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`SyncError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(SyncError);

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            SyncError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            SyncError::Parse(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            SyncError::DeviceNotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            SyncError::BusUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "message bus unavailable".to_string(),
            ),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
