//! HTTP error mapping.
//!
//! Every rejection leaves the server as a status code plus an
//! `{"error": "..."}` body. Internal details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chess_core::SessionError;
use chess_protocol::{ErrorBody, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("too many requests")]
    RateLimited,

    #[error("origin not allowed")]
    OriginRejected,

    #[error("too many connections")]
    ConnectionLimit,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Session(e) => match e {
                SessionError::NotFound => StatusCode::NOT_FOUND,
                SessionError::Unauthorized => StatusCode::FORBIDDEN,
                SessionError::Full
                | SessionError::GameUnavailable
                | SessionError::OutOfTurn
                | SessionError::IllegalMove => StatusCode::BAD_REQUEST,
            },
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::OriginRejected => StatusCode::FORBIDDEN,
            ApiError::ConnectionLimit => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}
