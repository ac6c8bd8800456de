// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Inbound middleware chain.
//!
//! Runs in this order on every request:
//! decode body → global rate limit → sanitize → (contact route only) route
//! rate limit. The decoded body travels in request extensions as
//! [`FormFields`]; downstream stages never touch raw bytes.

use crate::error::{ApiError, ErrorResponse};
use crate::handlers::AppState;
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::sanitize::neutralize_value;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Request body ceiling in bytes.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Decoded request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields(pub Map<String, Value>);

/// Decode JSON or URL-encoded bodies into [`FormFields`].
pub async fn decode_body(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let declared_len = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > MAX_BODY_BYTES) {
        return ApiError::payload_too_large(MAX_BODY_BYTES).into_response();
    }

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Request body rejected");
            return ApiError::payload_too_large(MAX_BODY_BYTES).into_response();
        }
    };

    let fields = match decode_fields(media_type(&parts.headers).as_deref(), &bytes) {
        Ok(fields) => fields,
        Err(e) => return e.into_response(),
    };

    parts.extensions.insert(FormFields(fields));
    next.run(Request::from_parts(parts, Body::empty())).await
}

/// Media type of the request, lower-cased and without parameters.
fn media_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(';').next().unwrap_or(s).trim().to_lowercase())
}

/// Decode a body by media type. Unknown types decode to no fields.
pub fn decode_fields(media_type: Option<&str>, bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if bytes.is_empty() {
        return Ok(Map::new());
    }

    match media_type {
        Some(mt) if mt == "application/json" || mt.ends_with("+json") => {
            match serde_json::from_slice::<Value>(bytes) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
                Err(e) => Err(ApiError::bad_request(format!("Malformed JSON body: {e}"))),
            }
        }
        Some("application/x-www-form-urlencoded") => Ok(url::form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect()),
        other => {
            debug!(content_type = ?other, "Body not decoded");
            Ok(Map::new())
        }
    }
}

/// Neutralize markup in every decoded string.
pub async fn sanitize_fields(mut request: Request, next: Next) -> Response {
    if let Some(FormFields(fields)) = request.extensions_mut().get_mut::<FormFields>() {
        fields.values_mut().for_each(neutralize_value);
    }
    next.run(request).await
}

/// Service-wide limiter, applied to every route.
pub async fn global_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state.global_limiter, request, next).await
}

/// Limiter for the contact route only.
pub async fn contact_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state.contact_limiter, request, next).await
}

async fn enforce(limiter: &RateLimiter, request: Request, next: Next) -> Response {
    let ip = client_ip(&request);

    match limiter.check_ip(ip).await {
        RateLimitResult::Allowed { remaining, reset_in } => {
            debug!(
                scope = limiter.scope(),
                ip = %ip,
                remaining,
                reset_in_secs = ceil_secs(reset_in),
                "Request allowed"
            );
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            // the innermost limiter reports; outer ones keep its values
            headers
                .entry("x-ratelimit-limit")
                .or_insert_with(|| HeaderValue::from(limiter.max_requests()));
            headers
                .entry("x-ratelimit-remaining")
                .or_insert_with(|| HeaderValue::from(remaining));
            response
        }
        RateLimitResult::Limited { retry_after } => {
            let retry_secs = ceil_secs(retry_after);
            info!(
                scope = limiter.scope(),
                ip = %ip,
                retry_after_secs = retry_secs,
                "Request rate limited"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    (header::RETRY_AFTER, retry_secs.to_string()),
                    (
                        header::HeaderName::from_static("x-ratelimit-limit"),
                        limiter.max_requests().to_string(),
                    ),
                    (
                        header::HeaderName::from_static("x-ratelimit-remaining"),
                        "0".to_string(),
                    ),
                ],
                Json(ErrorResponse {
                    error: limiter.message().to_string(),
                    code: "RATE_LIMITED",
                    retry_after_secs: Some(retry_secs),
                }),
            )
                .into_response()
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Peer address of the connection. Requests without connection info share
/// the unspecified address.
pub fn client_ip(request: &Request) -> IpAddr {
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip(),
        None => {
            debug!("No connection info on request");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }
}
