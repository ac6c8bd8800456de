// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Accepts contact-form submissions on `POST /api/contact`, checks the
//! visitor's challenge token with a reCAPTCHA-style service and forwards
//! the message to a fixed mailbox over SMTP.
//!
//! - Global and per-route rate limiting (5 requests / 10 min per address)
//! - Body decoding (JSON, URL-encoded) with a 10 KB ceiling
//! - Markup neutralization and HTML escaping of every text field
//! - Field validation with per-field 422 errors
//! - Hardening response headers and a permissive CORS policy

pub mod app;
pub mod captcha;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod middleware;
pub mod sanitize;
pub mod validator;

pub use app::build_router;
pub use config::Config;
pub use limiter::{RateLimitResult, RateLimitStore, RateLimiter};
pub use validator::{ContactSubmission, ContactValidator};
