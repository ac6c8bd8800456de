// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for the contact relay.
//!
//! Builds the real router around in-process fakes for the challenge
//! verifier and the mail transport, and drives it with `oneshot`.

#![allow(dead_code)]

pub mod fakes;
pub mod generators;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response};
use axum::Router;
use contact_relay::{
    build_router,
    config::RateLimitConfig,
    handlers::AppState,
    limiter::RateLimiter,
    mailer::Sender,
    validator::ContactValidator,
};
use fakes::{RecordingMailer, StubVerifier};
use lettre::message::Mailbox;
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;

/// A router plus handles on its fakes.
pub struct TestApp {
    pub router: Router,
    pub verifier: Arc<StubVerifier>,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestAppBuilder {
    global: RateLimitConfig,
    contact: RateLimitConfig,
    verifier: StubVerifier,
    mailer: RecordingMailer,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            global: RateLimitConfig::default(),
            contact: RateLimitConfig::default(),
            verifier: StubVerifier::passing(),
            mailer: RecordingMailer::new(),
        }
    }

    pub fn global_limit(mut self, max_requests: u32) -> Self {
        self.global.max_requests = max_requests;
        self
    }

    pub fn contact_limit(mut self, max_requests: u32) -> Self {
        self.contact.max_requests = max_requests;
        self
    }

    pub fn verifier(mut self, verifier: StubVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn mailer(mut self, mailer: RecordingMailer) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn build(self) -> TestApp {
        let verifier = Arc::new(self.verifier);
        let mailer = Arc::new(self.mailer);
        let state = Arc::new(AppState {
            global_limiter: RateLimiter::new("global", &self.global),
            contact_limiter: RateLimiter::new("contact", &self.contact),
            validator: ContactValidator::new(),
            verifier: verifier.clone(),
            mailer: mailer.clone(),
            sender: Sender {
                from: "\"Website Contact\" <site@example.com>"
                    .parse::<Mailbox>()
                    .unwrap(),
                to: "owner@example.com".parse::<Mailbox>().unwrap(),
            },
        });

        TestApp {
            router: build_router(state),
            verifier,
            mailer,
        }
    }
}

impl TestApp {
    /// Default app: passing verifier, working mailer, default limits.
    pub fn new() -> Self {
        TestAppBuilder::new().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::new()
    }

    /// Send a request as if it arrived from `ip`.
    pub async fn send(&self, ip: IpAddr, mut request: Request<Body>) -> Response<Body> {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip, 40000)));
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, ip: IpAddr, body: &Value) -> Response<Body> {
        self.send(ip, json_request("/api/contact", body)).await
    }
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
