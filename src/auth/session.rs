// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped session context.
//!
//! The authorization middleware runs reconciliation and, on success, inserts
//! a [`CurrentSession`] into the request extensions. Handlers take it as an
//! extractor:
//!
//! ```rust,ignore
//! async fn whoami(session: CurrentSession) -> impl IntoResponse {
//!     // session.record.user is the brokered user snapshot
//! }
//! ```
//!
//! The extractor only reads the extension. A route that takes
//! `CurrentSession` without sitting behind the middleware rejects every
//! request, which is the safe direction to fail in.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::Role;
use crate::error::AppError;
use crate::models::SessionRecord;

/// The reconciled session attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    /// Opaque token the client presented. Logout deletes under this key.
    pub token: String,
    /// The brokered record, possibly freshly repaired this request.
    pub record: SessionRecord,
    /// Role resolved from the record's user snapshot.
    pub role: Role,
}

impl CurrentSession {
    pub fn new(token: impl Into<String>, record: SessionRecord) -> Self {
        let role = record.role();
        Self {
            token: token.into(),
            record,
            role,
        }
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(AppError::unauthenticated)
    }
}
