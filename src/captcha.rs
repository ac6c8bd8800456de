// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Challenge-token verification against a reCAPTCHA-style `siteverify` API.

use crate::config::CaptchaConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Outbound verification failures. None of these mean the challenge failed.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Challenge verification timed out after {0:?}")]
    Timeout(Duration),

    #[error("Challenge verification request failed: {0}")]
    Transport(String),

    #[error("Challenge verification service returned status {0}")]
    Status(u16),

    #[error("Challenge verification payload unreadable: {0}")]
    Decode(String),
}

/// Outcome of a completed verification call.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub passed: bool,
    /// Raw service payload, echoed to the client on rejection
    pub payload: Value,
}

#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Verification, VerifyError>;
}

/// HTTPS client for the reCAPTCHA `siteverify` endpoint.
pub struct ReCaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
    success_field: String,
    timeout: Duration,
}

impl ReCaptchaVerifier {
    pub fn new(config: &CaptchaConfig) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            secret: config.secret_key.clone(),
            success_field: config.success_field.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl ChallengeVerifier for ReCaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<Verification, VerifyError> {
        let response = self
            .client
            .post(&self.verify_url)
            .query(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifyError::Timeout(self.timeout)
                } else {
                    VerifyError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Challenge verification service error");
            return Err(VerifyError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                VerifyError::Timeout(self.timeout)
            } else {
                VerifyError::Decode(e.to_string())
            }
        })?;

        let passed = is_passed(&payload, &self.success_field);
        debug!(passed, payload = %payload, "Challenge verification response");
        Ok(Verification { passed, payload })
    }
}

/// A payload passes when `field` holds something other than null, false or "".
pub fn is_passed(payload: &Value, field: &str) -> bool {
    match payload.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
