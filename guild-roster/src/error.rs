//! HTTP error mapping for guild-roster

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body or path (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or rejected caller session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict (409), e.g. sync already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// guild-common error
    #[error(transparent)]
    Common(#[from] guild_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        use guild_common::Error;

        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Common(err) => {
                let (status, code) = match err {
                    Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    Error::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
                    Error::EmptySet(_) => (StatusCode::NOT_FOUND, "EMPTY_SET"),
                    Error::Authentication(_) => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR"),
                    Error::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                    Error::Transport(_) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
                    Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                    Error::Storage(_) | Error::Io(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                    }
                    Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                };
                (status, code, err.to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
