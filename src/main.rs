// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Relays website contact-form submissions to a mailbox after verifying the
//! visitor's reCAPTCHA token.
//!
//! ## Configuration
//!
//! Read from environment variables; a `.env` file is loaded first when
//! present:
//!
//! - `CAPTCHA_SECRET_KEY`: challenge verification secret (required)
//! - `EMAIL`, `PASSWORD`: sender address and SMTP credentials (required)
//! - `TOEMAIL`: recipient address (required)
//! - `HOST`, `MAILPORT`: SMTP server (required)
//! - `PORT`: listen port (default: 5000)
//! - `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`: limiter window (default: 5 / 600)
//! - `OUTBOUND_TIMEOUT_SECS`: timeout for verification and SMTP (default: 10)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    build_router,
    captcha::ReCaptchaVerifier,
    config::Config,
    handlers::AppState,
    limiter::RateLimiter,
    mailer::{Sender, SmtpMailer},
    validator::ContactValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to read .env: {e}");
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    let addr = config.bind_addr()?;
    info!(
        bind_addr = %addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        smtp_host = %config.mail.host,
        smtp_port = config.mail.port,
        "Starting contact relay"
    );

    let state = Arc::new(AppState {
        global_limiter: RateLimiter::new("global", &config.rate_limit),
        contact_limiter: RateLimiter::new("contact", &config.rate_limit),
        validator: ContactValidator::new(),
        verifier: Arc::new(ReCaptchaVerifier::new(&config.captcha)?),
        mailer: Arc::new(SmtpMailer::new(&config.mail)?),
        sender: Sender::from_config(&config.mail)?,
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.global_limiter.cleanup().await;
            cleanup_state.contact_limiter.cleanup().await;
        }
    });

    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "App is listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
