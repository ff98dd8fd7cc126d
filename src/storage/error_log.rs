// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent record of every error response served.
//!
//! Each failed request is appended to a daily JSONL file. Recording is
//! best-effort by contract: the capture layer logs a warning and moves on if
//! a write fails, so a broken disk can never take the error path down with
//! it.
//!
//! Everything that enters a record passes through [`redact`] first. Session
//! tokens, passwords, and upstream credentials must never reach disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Lowercased key fragments whose values are always replaced before
/// persisting. Substring match, so `refresh_token` and `old_password`
/// are caught by `token` and `password`.
const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "password",
    "secret",
    "key",
    "credential",
    "authorization",
    "cookie",
    "session",
];

const REDACTED: &str = "[REDACTED]";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ErrorLogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

// =============================================================================
// ErrorRecord
// =============================================================================

/// One persisted error, as served to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Unique record ID.
    pub id: String,
    /// When the error response was served.
    pub created_at: DateTime<Utc>,
    /// Stable error code.
    pub code: String,
    /// Canonical kind name (`ValidationError`, `SupabaseError`, ...).
    #[serde(rename = "type")]
    pub error_type: String,
    /// User-facing message.
    pub message: String,
    /// Internal diagnostic message.
    #[serde(rename = "devMessage")]
    pub dev_message: String,
    /// Structured error data, redacted.
    pub data: Option<Value>,
    /// Request context (method, path), redacted.
    pub extra: Option<Value>,
    /// Client IP, if the proxy passed one along.
    pub ip: Option<String>,
}

impl ErrorRecord {
    /// Build a record from a served error. `data` is redacted here, not at
    /// write time, so a record never holds secrets even in memory.
    pub fn new(error: &AppError) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            code: error.code().to_string(),
            error_type: error.kind().as_str().to_string(),
            message: error.message().to_string(),
            dev_message: error.dev_message().to_string(),
            data: error.data().map(redact),
            extra: None,
            ip: None,
        }
    }

    /// Attach request context.
    pub fn with_request(mut self, method: &str, path: &str) -> Self {
        self.extra = Some(serde_json::json!({
            "method": method,
            "path": path,
        }));
        self
    }

    /// Attach the client IP.
    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

/// Replace the value of every sensitive key, recursively. Arrays and nested
/// objects are walked; scalars pass through untouched.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, inner) in map {
                let lowered = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|frag| lowered.contains(frag)) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

// =============================================================================
// ErrorLogRepository
// =============================================================================

/// Append-only error log, one JSONL file per day.
pub struct ErrorLogRepository {
    dir: PathBuf,
}

impl ErrorLogRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn day_file(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{date}.jsonl"))
    }

    /// Append one record to today's file, creating directory and file as
    /// needed.
    pub fn record(&self, record: &ErrorRecord) -> Result<(), ErrorLogError> {
        std::fs::create_dir_all(&self.dir)?;

        let date = record.created_at.format("%Y-%m-%d").to_string();
        let line = serde_json::to_string(record)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_file(&date))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Read back every record for a date (`YYYY-MM-DD`). Missing file reads
    /// as empty.
    pub fn read_day(&self, date: &str) -> Result<Vec<ErrorRecord>, ErrorLogError> {
        let path = self.day_file(date);
        if !Path::new(&path).exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn setup() -> (tempfile::TempDir, ErrorLogRepository) {
        let temp = tempfile::tempdir().unwrap();
        let repo = ErrorLogRepository::new(temp.path().join("errors"));
        (temp, repo)
    }

    #[test]
    fn redact_replaces_sensitive_keys_recursively() {
        let input = json!({
            "email": "ada@example.com",
            "password": "hunter2",
            "nested": {
                "refresh_token": "abc",
                "count": 3,
            },
            "list": [{ "api_key": "xyz", "name": "ok" }],
        });

        let redacted = redact(&input);
        assert_eq!(redacted["email"], "ada@example.com");
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["nested"]["refresh_token"], REDACTED);
        assert_eq!(redacted["nested"]["count"], 3);
        assert_eq!(redacted["list"][0]["api_key"], REDACTED);
        assert_eq!(redacted["list"][0]["name"], "ok");
    }

    #[test]
    fn redact_matches_key_fragments_case_insensitively() {
        let input = json!({ "AUTH-ACCESS-TOKEN": "t", "SessionId": "s" });
        let redacted = redact(&input);
        assert_eq!(redacted["AUTH-ACCESS-TOKEN"], REDACTED);
        assert_eq!(redacted["SessionId"], REDACTED);
    }

    #[test]
    fn record_from_error_redacts_data() {
        let error = AppError::new("AUTH-002", ErrorKind::Authentication)
            .with_data(json!({ "email": "ada@example.com", "password": "hunter2" }));

        let record = ErrorRecord::new(&error)
            .with_request("POST", "/v1/auth/login")
            .with_ip(Some("203.0.113.9".to_string()));

        assert_eq!(record.code, "AUTH-002");
        assert_eq!(record.error_type, "AuthenticationError");
        assert_eq!(record.data.as_ref().unwrap()["password"], REDACTED);
        assert_eq!(record.extra.as_ref().unwrap()["path"], "/v1/auth/login");
        assert_eq!(record.ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn record_and_read_day_roundtrips() {
        let (_temp, repo) = setup();

        let first = ErrorRecord::new(&AppError::unauthenticated());
        let second =
            ErrorRecord::new(&AppError::internal()).with_request("GET", "/v1/auth/user");
        repo.record(&first).unwrap();
        repo.record(&second).unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let records = repo.read_day(&today).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "Unauthenticated");
        assert_eq!(records[1].code, "Internal");
        assert_eq!(records[1].extra.as_ref().unwrap()["method"], "GET");
    }

    #[test]
    fn read_missing_day_is_empty() {
        let (_temp, repo) = setup();
        assert!(repo.read_day("1999-01-01").unwrap().is_empty());
    }

    #[test]
    fn record_surfaces_unwritable_directory() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("errors");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let repo = ErrorLogRepository::new(&blocker);
        let result = repo.record(&ErrorRecord::new(&AppError::internal()));
        assert!(result.is_err());
    }

    #[test]
    fn json_uses_wire_field_names() {
        let record = ErrorRecord::new(&AppError::unauthorized());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("type").is_some());
        assert!(value.get("devMessage").is_some());
        assert!(value.get("error_type").is_none());
    }
}
