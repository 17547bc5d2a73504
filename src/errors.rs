//! Errors surfaced by the HTTP layer and how each one is rendered.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// Body was not valid JSON or did not have the request shape.
    #[error("{0}")]
    InvalidPayload(String),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn request_not_found() -> Self {
        ApiError::NotFound("Request not found".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("Storage error: {}", err);
        match err {
            StoreError::Unavailable(msg) => ApiError::Unavailable(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend details stay in the logs.
        let body = match self {
            ApiError::NotFound(detail) | ApiError::Forbidden(detail) | ApiError::InvalidPayload(detail) => {
                json!({ "detail": detail })
            }
            ApiError::Unavailable(_) => json!({ "error": "Database unavailable" }),
            ApiError::Internal(_) => json!({ "error": "Internal server error" }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_server_side_statuses() {
        let unavailable: ApiError = StoreError::Unavailable("no primary".to_string()).into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let conflict: ApiError = StoreError::Conflict("abc".to_string()).into();
        assert_eq!(conflict.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_keep_their_status() {
        assert_eq!(ApiError::request_not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Forbidden("nope".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::InvalidPayload("bad".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
