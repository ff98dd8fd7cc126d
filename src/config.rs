// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. The Supabase
//! clients read their own variables separately (see `providers::supabase`).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the session store and error log | `/data` |
//! | `ENVIRONMENT` | `development` or `production` (controls error disclosure) | `production` |
//! | `SESSION_TTL_DAYS` | Absolute lifetime of a brokered session | `30` |
//! | `COOKIE_SECURE` | Set the `Secure` attribute on the session cookie | `true` |
//! | `SUPABASE_URL` | Supabase project base URL | Required |
//! | `SUPABASE_ANON_KEY` | Restricted (anon) API key | Required |
//! | `SUPABASE_SERVICE_ROLE_KEY` | Elevated (service role) API key | Required |
//! | `RESET_PASSWORD_REDIRECT_URL` | Redirect target in recovery emails | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use chrono::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    Missing(String),

    #[error("configuration invalid: {0}")]
    Invalid(String),
}

/// Deployment environment, controlling how much detail error responses
/// disclose. Anything that does not spell `development` is production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name. Unrecognized values fall back to
    /// `Production` so a typo never turns on development disclosure.
    pub fn parse(value: &str) -> Environment {
        if value.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    /// Read the deployment environment from `ENVIRONMENT`.
    pub fn from_env() -> Environment {
        Environment::parse(&env_or_default("ENVIRONMENT", "production"))
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Application-level configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub environment: Environment,
    /// Absolute lifetime of a brokered session. Set once at login and never
    /// extended by reconciliation.
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", DEFAULT_HOST);
        let port = parse_port(&env_or_default("PORT", &DEFAULT_PORT.to_string()))?;
        let data_dir = PathBuf::from(env_or_default("DATA_DIR", DEFAULT_DATA_DIR));
        let environment = Environment::from_env();
        let ttl_days = parse_ttl_days(&env_or_default(
            "SESSION_TTL_DAYS",
            &DEFAULT_SESSION_TTL_DAYS.to_string(),
        ))?;
        let cookie_secure = parse_bool(&env_or_default("COOKIE_SECURE", "true"))?;

        Ok(Self {
            host,
            port,
            data_dir,
            environment,
            session_ttl: Duration::days(ttl_days),
            cookie_secure,
        })
    }

    /// Path of the embedded session database inside the data directory.
    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir.join("sessions.redb")
    }

    /// Directory holding the JSONL error log files.
    pub fn error_log_dir(&self) -> PathBuf {
        self.data_dir.join("errors")
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port number: {value}")))
}

fn parse_ttl_days(value: &str) -> Result<i64, ConfigError> {
    let days: i64 = value.parse().map_err(|_| {
        ConfigError::Invalid(format!("SESSION_TTL_DAYS is not a valid number: {value}"))
    })?;
    if days <= 0 {
        return Err(ConfigError::Invalid(
            "SESSION_TTL_DAYS must be positive".to_string(),
        ));
    }
    Ok(days)
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "expected a boolean, got: {other}"
        ))),
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
