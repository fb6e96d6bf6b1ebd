//! HTTP-facing error type for the webhook gateway. Wraps
//! `trading_core::error::Error` plus a couple of transport-only variants
//! that only make sense at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("webhook signature verification failed")]
    SignatureInvalid,

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Core(#[from] trading_core::error::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            GatewayError::Core(trading_core::error::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            GatewayError::Core(trading_core::error::Error::ResumeRejected(_)) => StatusCode::CONFLICT,
            GatewayError::Core(trading_core::error::Error::InvalidSignal(_)) => StatusCode::BAD_REQUEST,
            GatewayError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::SignatureInvalid => "SIGNATURE_INVALID",
            GatewayError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            GatewayError::Core(trading_core::error::Error::NotFound(_)) => "NOT_FOUND",
            GatewayError::Core(trading_core::error::Error::ResumeRejected(_)) => "RESUME_REJECTED",
            GatewayError::Core(trading_core::error::Error::InvalidSignal(_)) => "INVALID_SIGNAL",
            GatewayError::Core(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal gateway error");
        }
        let body = ErrorResponse::new(self.error_code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
