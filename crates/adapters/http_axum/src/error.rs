//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use wattlog_domain::error::{ValidationError, WattlogError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// A use-case failed.
    Domain(WattlogError),
    /// Missing or wrong bearer secret.
    Unauthorized,
    /// The collection trigger was called but no secret is configured.
    CronSecretMissing,
}

impl From<WattlogError> for ApiError {
    fn from(err: WattlogError) -> Self {
        Self::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Domain(WattlogError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(WattlogError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Domain(WattlogError::Duplicate(err)) => (StatusCode::CONFLICT, err.to_string()),
            Self::Domain(err @ (WattlogError::Storage(_) | WattlogError::Telemetry(_))) => {
                tracing::error!(error = ?err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::CronSecretMissing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "collection trigger is not configured".to_string(),
            ),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
