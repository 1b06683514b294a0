//! Structured API errors

use std::any::Any;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Errors returned to API clients as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed client input
    BadRequest(String),
    /// Speech synthesis failed upstream
    SynthesisFailed(String),
    /// Global request quota exhausted
    RateLimited,
    /// Unexpected internal failure
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::SynthesisFailed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status();
        let message = match self {
            Self::BadRequest(msg) | Self::Internal(msg) => msg,
            Self::SynthesisFailed(msg) => format!("Failed to generate audio: {msg}"),
            Self::RateLimited => "Rate limit exceeded".to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Convert a handler panic into a 500 response carrying the panic message
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "internal server error".to_string());

    tracing::error!(error = %message, "request handler panicked");
    ApiError::Internal(message).into_response()
}
