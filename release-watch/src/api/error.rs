//! Mapping of crate errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::error::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// An error answered as `{"code": .., "message": ..}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn with_status(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 422, for well-formed requests carrying an unusable identifier.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// 503, when the state was built without a store.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => Self::not_found(err.to_string()),
            Error::Conflict { .. } => Self::conflict(err.to_string()),
            Error::Validation(msg) => Self::validation(msg),
            Error::Configuration(msg) => Self::bad_request(msg),
            Error::DatabaseSqlx(_) | Error::Database(_) | Error::Migration(_) => {
                error!(error = %err, "Database error while handling request");
                Self::internal("Database error occurred")
            }
            other => {
                error!(error = %other, "Unexpected error while handling request");
                Self::internal("An unexpected error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: ApiError = Error::not_found("watched item", "github:acme/app").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.message, "watched item github:acme/app not found");

        let err: ApiError = Error::conflict("watched item", "github:acme/app").into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = Error::validation("identifier must not be empty").into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "identifier must not be empty");

        let err: ApiError = Error::Database("locked".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("locked"));
    }

    #[test]
    fn test_body_omits_status() {
        let body = serde_json::to_value(ApiError::conflict("taken")).unwrap();
        assert_eq!(body, serde_json::json!({"code": "CONFLICT", "message": "taken"}));
    }
}
