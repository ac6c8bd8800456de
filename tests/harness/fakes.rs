// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! In-process stand-ins for the outbound collaborators.

use async_trait::async_trait;
use contact_relay::captcha::{ChallengeVerifier, Verification, VerifyError};
use contact_relay::mailer::{DeliveryInfo, Envelope, MailError, Mailer, OutboundEmail};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum StubOutcome {
    Pass(Value),
    Reject(Value),
    Timeout,
    Unreachable,
}

/// Verifier returning a fixed outcome and recording the tokens it saw.
pub struct StubVerifier {
    outcome: StubOutcome,
    tokens: Mutex<Vec<String>>,
}

impl StubVerifier {
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn passing() -> Self {
        Self::new(StubOutcome::Pass(json!({
            "success": true,
            "score": 0.9,
            "action": "contact"
        })))
    }

    pub fn rejecting() -> Self {
        Self::new(StubOutcome::Reject(json!({
            "success": false,
            "error-codes": ["timeout-or-duplicate"]
        })))
    }

    pub fn calls(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<Verification, VerifyError> {
        self.tokens.lock().unwrap().push(token.to_string());
        match &self.outcome {
            StubOutcome::Pass(payload) => Ok(Verification {
                passed: true,
                payload: payload.clone(),
            }),
            StubOutcome::Reject(payload) => Ok(Verification {
                passed: false,
                payload: payload.clone(),
            }),
            StubOutcome::Timeout => Err(VerifyError::Timeout(Duration::from_secs(10))),
            StubOutcome::Unreachable => {
                Err(VerifyError::Transport("connection refused".to_string()))
            }
        }
    }
}

/// Mailer that keeps every message it is handed.
pub struct RecordingMailer {
    fail_with: Option<String>,
    sent: Mutex<Vec<OutboundEmail>>,
    attempts: AtomicUsize,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::new()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<DeliveryInfo, MailError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.fail_with {
            return Err(MailError::Transport(reason.clone()));
        }

        let info = DeliveryInfo {
            message_id: format!("<test-{n}@example.com>"),
            envelope: Envelope {
                from: email.from.email.to_string(),
                to: vec![email.to.email.to_string()],
            },
            accepted: vec![email.to.email.to_string()],
            rejected: Vec::new(),
            response: "250 2.0.0 OK queued".to_string(),
        };
        self.sent.lock().unwrap().push(email);
        Ok(info)
    }
}
