// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators.

use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// The reference submission used across suites.
pub fn valid_submission() -> Value {
    json!({
        "name": "Alice",
        "email": "alice@example.com",
        "subject": "Hi",
        "message": "Hello",
        "recaptcha_response": "valid-token"
    })
}

/// Same submission with one field replaced.
pub fn submission_with(field: &str, value: Value) -> Value {
    let mut body = valid_submission();
    body[field] = value;
    body
}

/// Same submission with one field removed.
pub fn submission_without(field: &str) -> Value {
    let mut body = valid_submission();
    if let Some(map) = body.as_object_mut() {
        map.remove(field);
    }
    body
}

/// Markup injection payloads.
pub fn markup_payloads() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "<img src=x onerror=alert(1)>",
        "</li></ul><a href=\"https://evil.example\">click</a>",
        "<svg/onload=alert(1)>",
        "\"><iframe src=javascript:alert(1)>",
        "<<script>>nested<</script>>",
        "<!-- comment -->",
        "<style>body{display:none}</style>",
    ]
}

/// Addresses that must fail validation.
pub fn invalid_emails() -> Vec<&'static str> {
    vec![
        "not-an-email",
        "alice@",
        "@example.com",
        "alice@localhost",
        "alice example@example.com",
        "Alice <alice@example.com>",
        "<script>@example.com",
        " alice@example.com ",
    ]
}
