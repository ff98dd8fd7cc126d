// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the REST API, plus the session record
//! kept in the embedded store. All API types derive `Serialize`,
//! `Deserialize`, and `ToSchema` for JSON handling and OpenAPI docs.
//!
//! Request bodies carry their own field validation; a failed validation
//! produces a `ValidationError` whose `data` lists the offending fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::error::AppError;

// =============================================================================
// Upstream Types
// =============================================================================

/// User profile snapshot as returned by the upstream auth API.
///
/// Captured into the session record at login and replaced wholesale when a
/// reconciliation repair issues fresh credentials. May go stale in between.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UpstreamUser {
    /// Upstream user id.
    pub id: String,
    /// Primary email, if the account has one.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form profile fields (name, surname, username, ...).
    #[serde(default)]
    #[schema(value_type = Object)]
    pub user_metadata: Map<String, Value>,
    /// Server-controlled fields; carries the role.
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

impl UpstreamUser {
    /// Role recorded by the upstream provider. Unknown or missing role
    /// strings fall back to `Public`, the lowest rank.
    pub fn role(&self) -> Role {
        self.app_metadata
            .role
            .as_deref()
            .and_then(Role::from_str)
            .unwrap_or(Role::Public)
    }
}

/// A full upstream session as issued by the password grant or a one-time
/// code redemption.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UpstreamUser,
}

// =============================================================================
// Session Record
// =============================================================================

/// Server-side session state, keyed by the opaque session token.
///
/// `expires_at` is absolute: set once at login and never extended.
/// Reconciliation replaces the credential fields and the user snapshot in
/// place but must carry `expires_at` over unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Upstream access token. Secret; never logged or disclosed.
    pub access_token: String,
    /// Upstream refresh token. Secret; never logged or disclosed.
    pub refresh_token: String,
    /// User snapshot captured when the credentials were issued.
    pub user: UpstreamUser,
    /// Absolute deadline after which the session is dead regardless of
    /// upstream state.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn role(&self) -> Role {
        self.user.role()
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = FieldErrors::new();
        fields.require_email("email", &self.email);
        fields.require_len("password", &self.password, 3, 128);
        fields.into_result("AUTH-005")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub name: String,
    pub surname: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = FieldErrors::new();
        fields.require_email("email", &self.email);
        fields.require_len("password", &self.password, 6, 128);
        fields.require_len("username", &self.username, 3, 128);
        fields.require_len("name", &self.name, 3, 128);
        fields.require_len("surname", &self.surname, 3, 128);
        fields.into_result("AUTH-006")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl ForgotPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = FieldErrors::new();
        fields.require_email("email", &self.email);
        fields.into_result("AUTH-007")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    /// Recovery access token from the password-reset link.
    pub access_token: String,
    /// Recovery refresh token from the password-reset link.
    pub refresh_token: String,
    pub password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = FieldErrors::new();
        fields.require_nonempty("access_token", &self.access_token);
        fields.require_nonempty("refresh_token", &self.refresh_token);
        fields.require_len("password", &self.password, 6, 128);
        fields.into_result("AUTH-008")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut fields = FieldErrors::new();
        fields.require_nonempty("old_password", &self.old_password);
        fields.require_len("new_password", &self.new_password, 6, 128);
        fields.into_result("AUTH-009")
    }
}

// =============================================================================
// Response Bodies
// =============================================================================

/// Generic success envelope for routes with no payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: LoginData,
}

/// Login payload handing the opaque session token to the client. The field
/// name matches the header/cookie the client sends it back under.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginData {
    #[serde(rename = "AUTH-ACCESS-TOKEN")]
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCheckResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub role: Role,
    #[serde(rename = "isValid")]
    pub is_valid: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDataResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Flattened profile: email, the user_metadata fields, and the role.
    #[schema(value_type = Object)]
    pub data: Value,
}

// =============================================================================
// Field Validation
// =============================================================================

/// Collects per-field validation problems for one request body.
struct FieldErrors {
    fields: Map<String, Value>,
}

impl FieldErrors {
    fn new() -> Self {
        Self { fields: Map::new() }
    }

    fn push(&mut self, field: &str, problem: String) {
        self.fields.insert(field.to_string(), Value::String(problem));
    }

    fn require_nonempty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "must not be empty".to_string());
        }
    }

    fn require_len(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.push(
                field,
                format!("must be between {min} and {max} characters"),
            );
        }
    }

    fn require_email(&mut self, field: &str, value: &str) {
        if !looks_like_email(value) {
            self.push(field, "must be a valid email address".to_string());
        }
    }

    fn into_result(self, code: &str) -> Result<(), AppError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(
                code,
                Value::Object(Map::from_iter([(
                    "fields".to_string(),
                    Value::Object(self.fields),
                )])),
            ))
        }
    }
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
/// Deliverability is the upstream provider's problem.
fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !value.contains(char::is_whitespace)
}
