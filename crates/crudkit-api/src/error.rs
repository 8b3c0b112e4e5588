//! Maps domain `AppError` to HTTP responses.

use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crudkit_core::error::{AppError, SERVER_ERROR_MESSAGE};

/// Result type returned by handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard API error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    /// Short error title.
    pub title: String,
    /// Human-readable detail, never internal for server errors.
    pub detail: String,
}

impl From<&AppError> for ApiErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.status_code(),
            title: err.title().to_string(),
            detail: err.public_detail(),
        }
    }
}

/// Transport wrapper around `AppError`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_server_error() {
            error!(
                kind = %err.kind,
                error = %err.message,
                causes = %source_chain(&err),
                "Request failed"
            );
        } else {
            warn!(kind = %err.kind, status = status.as_u16(), error = %err.message, "Request rejected");
        }

        (status, Json(ApiErrorResponse::from(&err))).into_response()
    }
}

/// Renders the `source()` chain of an error, innermost last.
fn source_chain(err: &AppError) -> String {
    let mut causes = Vec::new();
    let mut current = std::error::Error::source(err);
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes.join(": ")
}

/// Response for a handler that panicked.
///
/// The panic itself is logged with its backtrace by the process panic hook.
pub fn panic_response(_payload: Box<dyn Any + Send + 'static>) -> Response {
    let body = ApiErrorResponse {
        code: 500,
        title: "Server error".to_string(),
        detail: SERVER_ERROR_MESSAGE.to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::error::{IntegrityViolation, VALIDATION_ERROR_MESSAGE};

    #[test]
    fn test_envelope_for_client_errors() {
        let body = ApiErrorResponse::from(&AppError::not_found("Example object with id=1 not found"));
        assert_eq!(body.code, 404);
        assert_eq!(body.title, "Not found");
        assert_eq!(body.detail, "Example object with id=1 not found");

        let body = ApiErrorResponse::from(&AppError::validation("name: length"));
        assert_eq!(body.code, 422);
        assert_eq!(body.detail, VALIDATION_ERROR_MESSAGE);
    }

    #[test]
    fn test_integrity_statuses() {
        let unique = AppError::integrity(IntegrityViolation::Unique, "duplicate key");
        assert_eq!(ApiErrorResponse::from(&unique).code, 409);
        assert_eq!(ApiErrorResponse::from(&unique).title, "Conflict");

        let not_null = AppError::integrity(IntegrityViolation::NotNull, "null value");
        assert_eq!(ApiErrorResponse::from(&not_null).code, 400);
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let body = ApiErrorResponse::from(&AppError::database("connection reset by peer"));
        assert_eq!(body.code, 500);
        assert_eq!(body.detail, SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError(AppError::bad_request("nope")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
