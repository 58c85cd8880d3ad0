use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::generator::GenerateError;
use crate::validation::ValidationError;

/// Errors surfaced to HTTP clients. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid JSON payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error(transparent)]
    RenderFailed(#[from] GenerateError),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request timed out")]
    RequestTimeout,

    #[error("internal server error")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedPayload(_)
            | ApiError::ValidationFailed(_)
            | ApiError::RenderFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn from_api_error(err: &ApiError) -> Self {
        Self::new(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::RenderFailed(err) => tracing::warn!(error = %err, "render failed"),
            ApiError::Internal(detail) => tracing::error!(detail = %detail, "internal error"),
            ApiError::RateLimited => {}
            other => tracing::debug!(error = %other, "request rejected"),
        }

        (self.status_code(), Json(ErrorResponse::from_api_error(&self))).into_response()
    }
}
