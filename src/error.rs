// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Centralized error responder.
//!
//! Failures that do not answer the client directly end up here: mail
//! transport errors, outbound verification failures, undecodable bodies and
//! unknown routes. Validation failures, challenge rejections and rate
//! limits build their own responses.

use crate::captcha::VerifyError;
use crate::mailer::MailError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    /// Fallback for failures that carry no status of their own.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", StatusCode::BAD_REQUEST, message)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            "PAYLOAD_TOO_LARGE",
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {limit} bytes"),
        )
    }

    pub fn not_found(method: &str, path: &str) -> Self {
        Self::new("NOT_FOUND", StatusCode::NOT_FOUND, format!("Cannot {method} {path}"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::new("MAIL_TRANSPORT_ERROR", StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Timeout(_) => {
                Self::new("VERIFICATION_TIMEOUT", StatusCode::GATEWAY_TIMEOUT, err.to_string())
            }
            VerifyError::Transport(_) | VerifyError::Status(_) | VerifyError::Decode(_) => {
                Self::new("VERIFICATION_UNAVAILABLE", StatusCode::BAD_GATEWAY, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), code = self.code, error = %self.message, "Request failed");
        } else {
            debug!(status = self.status.as_u16(), code = self.code, error = %self.message, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
            retry_after_secs: None,
        });
        (self.status, body).into_response()
    }
}
