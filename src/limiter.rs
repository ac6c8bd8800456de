// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for the contact relay.
//!
//! Two limiters run on every contact submission:
//! 1. A global limiter covering every route (5 requests / 10 min default)
//! 2. A route limiter on `/api/contact` with its own counters
//!
//! Counter storage sits behind [`RateLimitStore`] so the in-memory table can
//! be swapped for a shared store when running more than one process.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Counter storage consulted by a [`RateLimiter`].
///
/// `check` counts the request against `key` and reports whether it fits in
/// the current window. Implementations must make the count-and-compare
/// atomic per key.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn check(&self, key: &str) -> RateLimitResult;

    /// Drop expired state. Stores with native expiry can ignore this.
    async fn cleanup(&self) {}
}

/// One counting window for one key.
#[derive(Debug)]
struct Window {
    hits: u32,
    reset_at: Instant,
}

/// In-memory fixed-window counters keyed by string.
pub struct FixedWindowStore {
    max_requests: u32,
    window: Duration,
    windows: RwLock<HashMap<String, Window>>,
}

impl FixedWindowStore {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window_duration())
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[async_trait]
impl RateLimitStore for FixedWindowStore {
    async fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let window = windows.entry(key.to_string()).or_insert_with(|| Window {
            hits: 0,
            reset_at: now + self.window,
        });

        if now >= window.reset_at {
            window.hits = 0;
            window.reset_at = now + self.window;
        }

        // Rejected requests still count toward the window.
        window.hits = window.hits.saturating_add(1);
        let reset_in = window.reset_at.duration_since(now);

        if window.hits <= self.max_requests {
            RateLimitResult::Allowed {
                remaining: self.max_requests - window.hits,
                reset_in,
            }
        } else {
            RateLimitResult::Limited {
                retry_after: reset_in,
            }
        }
    }

    async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        windows.retain(|_, window| now < window.reset_at);
    }
}

/// A named limiter over a [`RateLimitStore`].
#[derive(Clone)]
pub struct RateLimiter {
    scope: &'static str,
    max_requests: u32,
    message: String,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Create a limiter backed by its own in-memory store.
    pub fn new(scope: &'static str, config: &RateLimitConfig) -> Self {
        Self::with_store(scope, config, Arc::new(FixedWindowStore::from_config(config)))
    }

    /// Create a limiter over an existing store.
    pub fn with_store(
        scope: &'static str,
        config: &RateLimitConfig,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            scope,
            max_requests: config.max_requests,
            message: config.message.clone(),
            store,
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Message sent to throttled clients.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check rate limit for an IP address.
    pub async fn check_ip(&self, ip: IpAddr) -> RateLimitResult {
        let key = format!("{}:{}", self.scope, ip);
        let result = self.store.check(&key).await;
        if let RateLimitResult::Limited { retry_after } = &result {
            debug!(scope = self.scope, %ip, ?retry_after, "Rate limit exceeded");
        }
        result
    }

    /// Clean up expired entries (should be called periodically).
    pub async fn cleanup(&self) {
        self.store.cleanup().await;
    }
}
