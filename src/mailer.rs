// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound email composition and SMTP delivery.
//!
//! One pooled transport is built at startup and shared by every request.

use crate::config::MailConfig;
use crate::sanitize::escape_html;
use crate::validator::ContactSubmission;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Mail composition and transport failures.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// A composed message, ready for a [`Mailer`].
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub html: String,
}

impl OutboundEmail {
    /// Compose the notification for a validated submission.
    pub fn compose(submission: &ContactSubmission, sender: &Sender) -> Self {
        Self {
            from: sender.from.clone(),
            to: sender.to.clone(),
            subject: submission.subject.clone(),
            html: render_body(submission),
        }
    }
}

/// Fixed sender and recipient mailboxes, parsed once from configuration.
#[derive(Debug, Clone)]
pub struct Sender {
    pub from: Mailbox,
    pub to: Mailbox,
}

impl Sender {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let from = parse_address(&config.from_address)?;
        let to = parse_address(&config.to_address)?;
        Ok(Self {
            from: Mailbox::new(Some(config.from_name.clone()), from),
            to: Mailbox::new(None, to),
        })
    }
}

fn parse_address(raw: &str) -> Result<Address, MailError> {
    raw.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Render the HTML body. Every interpolated value is escaped.
pub fn render_body(submission: &ContactSubmission) -> String {
    format!(
        "<p>You have a new contact request</p>\n\
         <h3>Contact Details</h3>\n\
         <ul>\n  \
         <li>Name: {name}</li>\n  \
         <li>Email: {email}</li>\n\
         </ul>\n\
         <p><strong>Message: </strong> {message}</p>\n\
         <strong>Please don't reply to this message</strong>\n",
        name = escape_html(&submission.name),
        email = escape_html(&submission.email),
        message = escape_html(&submission.message),
    )
}

/// Delivery metadata reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryInfo {
    pub message_id: String,
    pub envelope: Envelope,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<DeliveryInfo, MailError>;
}

/// SMTP delivery over a pooled lettre transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    message_domain: String,
}

impl SmtpMailer {
    /// Build the transport. No connection is opened until the first send.
    ///
    /// Port 465 uses implicit TLS; every other port upgrades with STARTTLS
    /// when the server offers it.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let tls_params = TlsParameters::new(config.host.clone())
            .map_err(|e| MailError::Transport(e.to_string()))?;
        let tls = if config.port == 465 {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout()))
            .pool_config(PoolConfig::new().max_size(config.pool_size))
            .build();

        let message_domain = config
            .from_address
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_else(|| config.host.clone());

        Ok(Self {
            transport,
            message_domain,
        })
    }

    fn build_message(&self, email: &OutboundEmail, message_id: &str) -> Result<Message, MailError> {
        Message::builder()
            .from(email.from.clone())
            .to(email.to.clone())
            .subject(email.subject.clone())
            .message_id(Some(message_id.to_string()))
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<DeliveryInfo, MailError> {
        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), self.message_domain);
        let message = self.build_message(&email, &message_id)?;

        let envelope = Envelope {
            from: message
                .envelope()
                .from()
                .map(ToString::to_string)
                .unwrap_or_default(),
            to: message.envelope().to().iter().map(ToString::to_string).collect(),
        };

        match self.transport.send(message).await {
            Ok(response) => {
                let response_text = format!(
                    "{} {}",
                    response.code(),
                    response
                        .message()
                        .map(|line| line.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
                info!(message_id = %message_id, response = %response_text, "Contact email sent");
                Ok(DeliveryInfo {
                    message_id,
                    accepted: envelope.to.clone(),
                    rejected: Vec::new(),
                    envelope,
                    response: response_text,
                })
            }
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "Contact email failed");
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}
