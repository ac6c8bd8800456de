// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Contact form validator.
//!
//! Implements field validation for contact submissions:
//! - `email` must be a syntactically valid address with a dotted domain
//! - `name`, `subject`, `message`, `recaptcha_response` must be non-empty
//!   after trimming
//! - text fields are HTML-escaped, the address is normalized

use crate::sanitize::escape_html;
use email_address::EmailAddress;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Wire name of the challenge token field.
pub const CHALLENGE_FIELD: &str = "recaptcha_response";

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Parameter {0} must be a string")]
    NotText(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

impl ValidationError {
    pub fn param(&self) -> &'static str {
        match self {
            Self::MissingParameter(p) | Self::NotText(p) => p,
            Self::InvalidEmail(_) => "email",
        }
    }
}

/// Field-level error descriptor returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub msg: &'static str,
    pub param: &'static str,
    pub location: &'static str,
}

impl FieldError {
    fn new(error: &ValidationError, value: Option<String>) -> Self {
        Self {
            value,
            msg: "Invalid value",
            param: error.param(),
            location: "body",
        }
    }
}

/// A submission that passed validation. Text fields are escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub challenge_token: String,
}

/// Contact submission validator.
#[derive(Debug, Clone, Default)]
pub struct ContactValidator;

impl ContactValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate decoded form fields.
    ///
    /// Every field is checked; the error list covers all failures in the
    /// order email, name, subject, message, recaptcha_response.
    pub fn validate(&self, fields: &Map<String, Value>) -> Result<ContactSubmission, Vec<FieldError>> {
        let mut errors = Vec::new();

        let mut reject = |err: ValidationError, value: Option<String>| {
            debug!(error = %err, "Field rejected");
            errors.push(FieldError::new(&err, value));
        };

        let email = match self.validate_email(fields.get("email")) {
            Ok(email) => Some(email),
            Err((err, value)) => {
                reject(err, value);
                None
            }
        };

        let mut text = |param: &'static str| match required_text(fields.get(param), param) {
            Ok(v) => Some(escape_html(&v)),
            Err((err, value)) => {
                reject(err, value);
                None
            }
        };
        let name = text("name");
        let subject = text("subject");
        let message = text("message");
        let challenge_token = text(CHALLENGE_FIELD);

        match (email, name, subject, message, challenge_token) {
            (Some(email), Some(name), Some(subject), Some(message), Some(challenge_token)) => {
                Ok(ContactSubmission {
                    name,
                    email,
                    subject,
                    message,
                    challenge_token,
                })
            }
            _ => {
                debug!(
                    failed = ?errors.iter().map(|e| e.param).collect::<Vec<_>>(),
                    "Contact submission invalid"
                );
                Err(errors)
            }
        }
    }

    /// Validate and normalize the `email` field. The address is checked
    /// as sent, so surrounding whitespace makes it invalid.
    fn validate_email(&self, raw: Option<&Value>) -> Result<String, (ValidationError, Option<String>)> {
        let value = field_text(raw, "email")?;
        if value.trim().is_empty() {
            return Err((ValidationError::MissingParameter("email"), Some(value)));
        }
        if !is_valid_email(&value) {
            return Err((ValidationError::InvalidEmail(value.clone()), Some(value)));
        }
        Ok(normalize_email(&value))
    }
}

/// Coerce a field to trimmed, non-empty text.
fn required_text(
    raw: Option<&Value>,
    param: &'static str,
) -> Result<String, (ValidationError, Option<String>)> {
    let text = field_text(raw, param)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err((ValidationError::MissingParameter(param), Some(text)));
    }
    Ok(trimmed.to_string())
}

/// Coerce a scalar field to text. Null, arrays and objects are rejected.
fn field_text(
    raw: Option<&Value>,
    param: &'static str,
) -> Result<String, (ValidationError, Option<String>)> {
    let text = match raw {
        None | Some(Value::Null) => return Err((ValidationError::MissingParameter(param), None)),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => return Err((ValidationError::NotText(param), Some(other.to_string()))),
    };
    Ok(text)
}

/// Syntactic address check; the domain must carry a TLD.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Ok(parsed) = EmailAddress::parse_with_options(value, Default::default()) else {
        return false;
    };
    if parsed.as_str() != value {
        // display-text form such as `Name <a@b.c>`
        return false;
    }

    let domain = parsed.domain();
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| !l.is_empty())
        && labels
            .last()
            .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic() || c == '-'))
            .unwrap_or(false)
}

const GMAIL_DOMAINS: &[&str] = &["gmail.com", "googlemail.com"];
const OUTLOOK_DOMAINS: &[&str] = &[
    "hotmail.at", "hotmail.be", "hotmail.ca", "hotmail.cl", "hotmail.co.il", "hotmail.co.nz",
    "hotmail.co.th", "hotmail.co.uk", "hotmail.com", "hotmail.com.ar", "hotmail.com.au",
    "hotmail.com.br", "hotmail.com.gr", "hotmail.com.mx", "hotmail.com.pe", "hotmail.com.tr",
    "hotmail.com.vn", "hotmail.cz", "hotmail.de", "hotmail.dk", "hotmail.es", "hotmail.fr",
    "hotmail.hu", "hotmail.id", "hotmail.ie", "hotmail.in", "hotmail.it", "hotmail.jp",
    "hotmail.kr", "hotmail.lv", "hotmail.my", "hotmail.ph", "hotmail.pt", "hotmail.sa",
    "hotmail.sg", "hotmail.sk", "live.be", "live.co.uk", "live.com", "live.com.ar",
    "live.com.mx", "live.de", "live.es", "live.eu", "live.fr", "live.it", "live.nl", "msn.com",
    "outlook.at", "outlook.be", "outlook.cl", "outlook.co.il", "outlook.co.nz", "outlook.co.th",
    "outlook.com", "outlook.com.ar", "outlook.com.au", "outlook.com.br", "outlook.com.gr",
    "outlook.com.pe", "outlook.com.tr", "outlook.com.vn", "outlook.cz", "outlook.de",
    "outlook.dk", "outlook.es", "outlook.fr", "outlook.hu", "outlook.id", "outlook.ie",
    "outlook.in", "outlook.it", "outlook.jp", "outlook.kr", "outlook.lv", "outlook.my",
    "outlook.ph", "outlook.pt", "outlook.sa", "outlook.sg", "outlook.sk", "passport.com",
];
const YAHOO_DOMAINS: &[&str] = &[
    "rocketmail.com", "yahoo.ca", "yahoo.co.uk", "yahoo.com", "yahoo.de", "yahoo.fr",
    "yahoo.in", "yahoo.it", "ymail.com",
];
const ICLOUD_DOMAINS: &[&str] = &["icloud.com", "me.com"];

/// Normalize a valid address.
///
/// Lower-cases the whole address and folds provider-specific aliases:
/// Gmail dots and `+tag`, Outlook and iCloud `+tag`, Yahoo `-tag`.
pub fn normalize_email(value: &str) -> String {
    let lowered = value.to_lowercase();
    let Some((local, domain)) = lowered.rsplit_once('@') else {
        return lowered;
    };

    let strip = |local: &str, sep: char| -> String {
        local.split(sep).next().unwrap_or(local).to_string()
    };

    let (local, domain) = if GMAIL_DOMAINS.contains(&domain) {
        (strip(local, '+').replace('.', ""), "gmail.com")
    } else if OUTLOOK_DOMAINS.contains(&domain) || ICLOUD_DOMAINS.contains(&domain) {
        (strip(local, '+'), domain)
    } else if YAHOO_DOMAINS.contains(&domain) {
        (strip(local, '-'), domain)
    } else {
        (local.to_string(), domain)
    };

    if local.is_empty() {
        // alias stripping never leaves an empty mailbox
        return lowered;
    }
    format!("{local}@{domain}")
}
