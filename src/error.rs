// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy and response shaping.
//!
//! Every failure that crosses the HTTP boundary is an [`AppError`]: a stable
//! `code`, a closed [`ErrorKind`], and optional structured `data`. The kind
//! alone decides the HTTP status and how much of the error is disclosed to
//! the caller; the code resolves user-facing and internal messages from a
//! static table. Construction never fails, whatever the inputs.
//!
//! Rendering has two modes. Development includes `devMessage` and `data` for
//! every kind. Production omits `devMessage` always and omits `data` for
//! every kind except `Validation`, whose data only echoes back what the
//! caller sent wrong.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::Environment;

/// Failure classification. Drives the HTTP status, the disclosure policy,
/// and how the failure is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller sent a malformed or out-of-range request body.
    Validation,
    /// The caller could not be authenticated (bad credentials, no session).
    Authentication,
    /// The caller is authenticated but lacks the required role.
    Authorization,
    /// A failure inside this service.
    Internal,
    /// The upstream Supabase API failed or rejected a call unexpectedly.
    Supabase,
    /// Fallback for unrecognized kind strings. Fails closed (500).
    Unknown,
}

impl ErrorKind {
    /// Resolve a free-form kind string against the known set. Unrecognized
    /// input maps to `Unknown` rather than failing; this is the one boundary
    /// where kinds arrive as text.
    pub fn parse(value: &str) -> ErrorKind {
        match value.trim().to_ascii_lowercase().as_str() {
            "validationerror" => ErrorKind::Validation,
            "authenticationerror" => ErrorKind::Authentication,
            "authorizationerror" => ErrorKind::Authorization,
            "internalerror" => ErrorKind::Internal,
            "supabaseerror" => ErrorKind::Supabase,
            _ => ErrorKind::Unknown,
        }
    }

    /// Canonical name, as persisted and logged.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Supabase => "SupabaseError",
            ErrorKind::Unknown => "UnknownError",
        }
    }

    /// Fixed, total status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::Authentication => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal | ErrorKind::Supabase | ErrorKind::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether `data` may be disclosed to the caller in the given mode.
    /// Validation data is caller-supplied and safe everywhere; everything
    /// else is development-only.
    fn discloses_data(&self, environment: Environment) -> bool {
        environment.is_development() || matches!(self, ErrorKind::Validation)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct CodeEntry {
    code: &'static str,
    message: &'static str,
    dev_message: &'static str,
}

/// Static code table. An unknown code resolves to empty messages rather
/// than an error; construction must never itself fail.
const CODE_TABLE: &[CodeEntry] = &[
    CodeEntry {
        code: "AUTH-001",
        message: "A user with this email address already exists.",
        dev_message: "Upstream user creation rejected the email as already registered.",
    },
    CodeEntry {
        code: "AUTH-002",
        message: "Invalid login credentials.",
        dev_message: "Upstream password grant rejected the credentials.",
    },
    CodeEntry {
        code: "AUTH-003",
        message: "Email is not confirmed. A new confirmation email has been sent.",
        dev_message: "Upstream reported the email as unconfirmed; confirmation resent.",
    },
    CodeEntry {
        code: "AUTH-004",
        message: "The old password is incorrect.",
        dev_message: "Re-authentication with the old password failed.",
    },
    CodeEntry {
        code: "AUTH-005",
        message: "Invalid login request.",
        dev_message: "Login body failed validation.",
    },
    CodeEntry {
        code: "AUTH-006",
        message: "Invalid registration request.",
        dev_message: "Registration body failed validation.",
    },
    CodeEntry {
        code: "AUTH-007",
        message: "Invalid forgot-password request.",
        dev_message: "Forgot-password body failed validation.",
    },
    CodeEntry {
        code: "AUTH-008",
        message: "Invalid reset-password request.",
        dev_message: "Reset-password body failed validation.",
    },
    CodeEntry {
        code: "AUTH-009",
        message: "Invalid change-password request.",
        dev_message: "Change-password body failed validation.",
    },
    CodeEntry {
        code: "Unauthenticated",
        message: "You must be logged in to access this resource.",
        dev_message: "No valid brokered session for the presented token.",
    },
    CodeEntry {
        code: "Unauthorized",
        message: "You do not have permission to access this resource.",
        dev_message: "Session role does not satisfy the route requirement.",
    },
    CodeEntry {
        code: "Supabase",
        message: "The authentication service could not process the request.",
        dev_message: "Upstream Supabase call failed.",
    },
    CodeEntry {
        code: "Internal",
        message: "Internal server error.",
        dev_message: "Unhandled internal failure.",
    },
];

fn lookup_code(code: &str) -> (&'static str, &'static str) {
    CODE_TABLE
        .iter()
        .find(|entry| entry.code == code)
        .map(|entry| (entry.message, entry.dev_message))
        .unwrap_or(("", ""))
}

/// A classified application error.
#[derive(Debug, Clone)]
pub struct AppError {
    code: String,
    kind: ErrorKind,
    data: Option<Value>,
}

/// JSON error envelope returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    pub code: String,
    pub message: String,
    #[serde(rename = "devMessage", skip_serializing_if = "Option::is_none")]
    pub dev_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AppError {
    pub fn new(code: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            code: code.into(),
            kind,
            data: None,
        }
    }

    /// Construct with the kind given as free text. The boundary counterpart
    /// of [`AppError::new`]; everything internal passes the enum.
    pub fn from_kind_str(code: impl Into<String>, kind: &str) -> Self {
        Self::new(code, ErrorKind::parse(kind))
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn validation(code: impl Into<String>, data: Value) -> Self {
        Self::new(code, ErrorKind::Validation).with_data(data)
    }

    pub fn unauthenticated() -> Self {
        Self::new("Unauthenticated", ErrorKind::Authentication)
    }

    pub fn unauthorized() -> Self {
        Self::new("Unauthorized", ErrorKind::Authorization)
    }

    pub fn supabase(data: Value) -> Self {
        Self::new("Supabase", ErrorKind::Supabase).with_data(data)
    }

    pub fn internal() -> Self {
        Self::new("Internal", ErrorKind::Internal)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// User-facing message from the code table. Empty for unknown codes.
    pub fn message(&self) -> &'static str {
        lookup_code(&self.code).0
    }

    /// Internal diagnostic message from the code table. Never sent to
    /// clients in production.
    pub fn dev_message(&self) -> &'static str {
        lookup_code(&self.code).1
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Shape the client-visible envelope for the given mode.
    pub fn render(&self, environment: Environment) -> ErrorEnvelope {
        let dev_message = if environment.is_development() {
            Some(self.dev_message().to_string())
        } else {
            None
        };
        let data = if self.kind.discloses_data(environment) {
            self.data.clone()
        } else {
            None
        };

        ErrorEnvelope {
            status: "error",
            code: self.code.clone(),
            message: self.message().to_string(),
            dev_message,
            data,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code, self.kind)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(self.render(Environment::from_env()));
        let mut response = (status, body).into_response();
        // Stashed for the error-capture layer, which persists a record of
        // every failed request after the response is built.
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    #[test]
    fn kind_parse_resolves_known_strings() {
        assert_eq!(ErrorKind::parse("ValidationError"), ErrorKind::Validation);
        assert_eq!(
            ErrorKind::parse("authenticationerror"),
            ErrorKind::Authentication
        );
        assert_eq!(
            ErrorKind::parse("AuthorizationError"),
            ErrorKind::Authorization
        );
        assert_eq!(ErrorKind::parse("SupabaseError"), ErrorKind::Supabase);
        assert_eq!(ErrorKind::parse("InternalError"), ErrorKind::Internal);
    }

    #[test]
    fn kind_parse_falls_back_to_unknown() {
        assert_eq!(ErrorKind::parse("SomethingElse"), ErrorKind::Unknown);
        assert_eq!(ErrorKind::parse(""), ErrorKind::Unknown);
        assert_eq!(ErrorKind::parse("validation"), ErrorKind::Unknown);
    }

    #[test]
    fn status_mapping_is_fixed() {
        assert_eq!(ErrorKind::Validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorKind::Authentication.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorKind::Authorization.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::Supabase.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::Unknown.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unknown_code_yields_empty_messages() {
        let err = AppError::new("NO-SUCH-CODE", ErrorKind::Internal);
        assert_eq!(err.message(), "");
        assert_eq!(err.dev_message(), "");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn known_code_resolves_messages() {
        let err = AppError::new("AUTH-002", ErrorKind::Authentication);
        assert_eq!(err.message(), "Invalid login credentials.");
        assert!(!err.dev_message().is_empty());
    }

    #[test]
    fn validation_data_is_disclosed_in_both_modes() {
        let err = AppError::validation("AUTH-005", json!({ "field": "email" }));

        let dev = err.render(Environment::Development);
        assert_eq!(dev.data, Some(json!({ "field": "email" })));
        assert!(dev.dev_message.is_some());

        let prod = err.render(Environment::Production);
        assert_eq!(prod.data, Some(json!({ "field": "email" })));
        assert!(prod.dev_message.is_none());
    }

    #[test]
    fn authentication_data_is_development_only() {
        let err = AppError::new("AUTH-002", ErrorKind::Authentication)
            .with_data(json!({ "field": "email" }));

        let dev = err.render(Environment::Development);
        assert_eq!(dev.data, Some(json!({ "field": "email" })));

        let prod = err.render(Environment::Production);
        assert!(prod.data.is_none());
        assert!(prod.dev_message.is_none());
    }

    #[test]
    fn from_kind_str_defaults_to_unknown() {
        let err = AppError::from_kind_str("Internal", "NotAKind");
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn into_response_carries_envelope_and_extension() {
        let response = AppError::unauthenticated().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<AppError>().is_some());

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "Unauthenticated");
        assert_eq!(
            body["message"],
            "You must be logged in to access this resource."
        );
    }

    #[tokio::test]
    async fn production_envelope_omits_dev_message_key() {
        let rendered = AppError::unauthorized().render(Environment::Production);
        let body = serde_json::to_value(&rendered).unwrap();
        assert!(body.get("devMessage").is_none());
        assert!(body.get("data").is_none());
        assert_eq!(body["code"], "Unauthorized");
    }
}
