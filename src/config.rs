// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Everything is read from the process environment (optionally seeded from
//! a `.env` file by the binary). Mail and challenge credentials have no
//! defaults; startup fails with a [`ConfigError`] when one is missing.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen interface (default: 0.0.0.0)
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Listen port (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Challenge verification configuration
    pub captcha: CaptchaConfig,

    /// Mail transport configuration
    pub mail: MailConfig,
}

/// Fixed-window rate limiting, applied both globally and on the contact route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per source address per window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Message returned with every 429
    #[serde(default = "default_limit_message")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    pub secret_key: String,

    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Payload field whose presence marks a passed challenge
    #[serde(default = "default_success_field")]
    pub success_field: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,

    /// Sender address; also the SMTP username by default
    pub from_address: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    pub to_address: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    600
}

fn default_limit_message() -> String {
    "Too many requests from this IP, please try again after 10 minutes".to_string()
}

fn default_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

fn default_success_field() -> String {
    "action".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_from_name() -> String {
    "Website Contact".to_string()
}

fn default_pool_size() -> u32 {
    4
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            message: default_limit_message(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl CaptchaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let timeout_secs = parse_or(get("OUTBOUND_TIMEOUT_SECS"), "OUTBOUND_TIMEOUT_SECS", default_timeout_secs())?;
        let from_address = required("EMAIL")?;

        let config = Config {
            bind_host: get("BIND_HOST").unwrap_or_else(default_bind_host),
            port: parse_or(get("PORT"), "PORT", default_port())?,
            rate_limit: RateLimitConfig {
                max_requests: parse_or(get("RATE_LIMIT_MAX"), "RATE_LIMIT_MAX", default_max_requests())?,
                window_secs: parse_or(get("RATE_LIMIT_WINDOW_SECS"), "RATE_LIMIT_WINDOW_SECS", default_window_secs())?,
                ..Default::default()
            },
            captcha: CaptchaConfig {
                secret_key: required("CAPTCHA_SECRET_KEY")?,
                verify_url: get("CAPTCHA_VERIFY_URL").unwrap_or_else(default_verify_url),
                success_field: get("CAPTCHA_SUCCESS_FIELD").unwrap_or_else(default_success_field),
                timeout_secs,
            },
            mail: MailConfig {
                host: required("HOST")?,
                port: parse_required(get("MAILPORT"), "MAILPORT")?,
                username: from_address.clone(),
                password: required("PASSWORD")?,
                from_address,
                from_name: get("MAIL_FROM_NAME").unwrap_or_else(default_from_name),
                to_address: required("TOEMAIL")?,
                timeout_secs,
                pool_size: parse_or(get("SMTP_POOL_SIZE"), "SMTP_POOL_SIZE", default_pool_size())?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_MAX",
                value: "0".to_string(),
                reason: "must allow at least one request".to_string(),
            });
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_WINDOW_SECS",
                value: "0".to_string(),
                reason: "window must be non-zero".to_string(),
            });
        }
        if self.captcha.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "OUTBOUND_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be non-zero".to_string(),
            });
        }
        if self.mail.pool_size == 0 {
            return Err(ConfigError::Invalid {
                var: "SMTP_POOL_SIZE",
                value: "0".to_string(),
                reason: "pool must hold at least one connection".to_string(),
            });
        }
        if let Err(e) = url::Url::parse(&self.captcha.verify_url) {
            return Err(ConfigError::Invalid {
                var: "CAPTCHA_VERIFY_URL",
                value: self.captcha.verify_url.clone(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_host.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                var: "BIND_HOST",
                value: self.bind_host.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_required<T>(raw: Option<String>, var: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = raw.ok_or(ConfigError::Missing(var))?;
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("CAPTCHA_SECRET_KEY", "secret"),
            ("EMAIL", "site@example.com"),
            ("TOEMAIL", "owner@example.com"),
            ("HOST", "smtp.example.com"),
            ("MAILPORT", "587"),
            ("PASSWORD", "hunter2"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:5000");
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_duration(), Duration::from_secs(600));
        assert_eq!(config.captcha.success_field, "action");
        assert_eq!(config.mail.username, "site@example.com");
        assert_eq!(config.mail.from_name, "Website Contact");
        assert_eq!(config.mail.port, 587);
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = base_env();
        env.remove("TOEMAIL");

        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("TOEMAIL"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("PASSWORD", "   ");

        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("PASSWORD"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut env = base_env();
        env.insert("PORT", "http");

        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut env = base_env();
        env.insert("RATE_LIMIT_WINDOW_SECS", "0");

        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { var: "RATE_LIMIT_WINDOW_SECS", .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut env = base_env();
        env.insert("OUTBOUND_TIMEOUT_SECS", "0");

        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { var: "OUTBOUND_TIMEOUT_SECS", .. })
        ));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let mut env = base_env();
        env.insert("SMTP_POOL_SIZE", "0");

        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { var: "SMTP_POOL_SIZE", .. })
        ));
    }

    #[test]
    fn test_ipv6_bind_host() {
        let mut env = base_env();
        env.insert("BIND_HOST", "::");

        let config = load(&env).unwrap();
        assert_eq!(config.bind_addr().unwrap().to_string(), "[::]:5000");
    }

    #[test]
    fn test_hostname_bind_host_rejected() {
        let mut env = base_env();
        env.insert("BIND_HOST", "localhost");

        let config = load(&env).unwrap();
        assert!(matches!(
            config.bind_addr(),
            Err(ConfigError::Invalid { var: "BIND_HOST", .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("PORT", "8080");
        env.insert("RATE_LIMIT_MAX", "20");
        env.insert("CAPTCHA_SUCCESS_FIELD", "success");
        env.insert("OUTBOUND_TIMEOUT_SECS", "3");

        let config = load(&env).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.captcha.success_field, "success");
        assert_eq!(config.captcha.timeout(), Duration::from_secs(3));
        assert_eq!(config.mail.timeout(), Duration::from_secs(3));
    }
}
