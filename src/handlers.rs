// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.

use crate::captcha::ChallengeVerifier;
use crate::error::ApiError;
use crate::limiter::RateLimiter;
use crate::mailer::{DeliveryInfo, Mailer, OutboundEmail, Sender};
use crate::middleware::FormFields;
use crate::validator::{ContactValidator, FieldError};
use axum::{
    extract::{Extension, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const SUCCESS_MESSAGE: &str =
    "Your message was successfully submitted, We will contact you soon..";
pub const CHALLENGE_REJECTED_MESSAGE: &str =
    "Please refresh the page if you want to send another message";

/// Shared application state.
pub struct AppState {
    pub global_limiter: RateLimiter,
    pub contact_limiter: RateLimiter,
    pub validator: ContactValidator,
    pub verifier: Arc<dyn ChallengeVerifier>,
    pub mailer: Arc<dyn Mailer>,
    pub sender: Sender,
}

/// 422 body for field validation failures.
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub errors: Vec<FieldError>,
}

/// 422 body when the challenge was not passed.
#[derive(Debug, Serialize)]
pub struct ChallengeRejectedResponse {
    pub status: u16,
    pub res: Value,
    pub msg: &'static str,
}

/// 200 body after the email went out.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub status: u16,
    pub msg: &'static str,
    pub fail: bool,
    pub info: DeliveryInfo,
}

/// Accept a contact submission and relay it by email.
///
/// Validation failures and challenge rejections answer directly with 422.
/// Outbound failures go through [`ApiError`].
pub async fn contact(
    State(state): State<Arc<AppState>>,
    fields: Option<Extension<FormFields>>,
) -> Result<Response, ApiError> {
    let FormFields(fields) = fields.map(|Extension(f)| f).unwrap_or_default();

    let submission = match state.validator.validate(&fields) {
        Ok(submission) => submission,
        Err(errors) => {
            info!(errors = errors.len(), "Contact submission failed validation");
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorResponse { errors }),
            )
                .into_response());
        }
    };

    let verification = state.verifier.verify(&submission.challenge_token).await?;
    if !verification.passed {
        info!("Challenge not passed, submission dropped");
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ChallengeRejectedResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                res: verification.payload,
                msg: CHALLENGE_REJECTED_MESSAGE,
            }),
        )
            .into_response());
    }
    debug!("Challenge passed");

    let email = OutboundEmail::compose(&submission, &state.sender);
    let delivery = state.mailer.send(email).await?;

    Ok((
        StatusCode::OK,
        Json(ContactResponse {
            status: StatusCode::OK.as_u16(),
            msg: SUCCESS_MESSAGE,
            fail: false,
            info: delivery,
        }),
    )
        .into_response())
}

/// JSON 404 for every unrouted path.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(method.as_str(), uri.path())
}
