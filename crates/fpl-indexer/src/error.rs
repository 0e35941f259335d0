//! Error types for the FPL indexer server.
//!
//! This module provides custom error types that implement `IntoResponse`
//! for seamless integration with Axum handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::ClientError;
use crate::store::StoreError;

/// Application-level errors for the indexer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Execution store error
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// League resolved to zero managers
    #[error("League {0} has no managers in its standings")]
    EmptyLeague(i64),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stale write against an execution document
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External service error
    #[error("External service error: {0}")]
    ExternalService(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::EmptyLeague(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ExternalService(msg) => {
                tracing::warn!(error = %msg, "External service error");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(format!("Execution not found: {}", id)),
            StoreError::Conflict { .. } => AppError::Conflict(err.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Execution not found: abc".to_string());
        assert_eq!(err.to_string(), "Resource not found: Execution not found: abc");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation("from_gw must be >= 1".to_string());
        assert_eq!(err.to_string(), "Validation error: from_gw must be >= 1");
    }

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: AppError = StoreError::Conflict {
            execution_id: "abc".to_string(),
            expected: 2,
            found: 3,
        }
        .into();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_upstream_failure_is_bad_gateway() {
        let err: AppError = ClientError::Status {
            status: 503,
            url: "https://fpl.test/api/bootstrap-static/".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_empty_league_is_not_found() {
        let response = AppError::EmptyLeague(10).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
