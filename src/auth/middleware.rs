// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role-gated authentication middleware.
//!
//! Routers attach one of the `require_*` layers per subtree. The layer
//! pulls the session token out of the request, runs reconciliation and
//! either rejects the request or stashes the reconciled
//! [`CurrentSession`] in the request extensions for extractors
//! downstream.
//!
//! Denials are deliberately uniform: whatever reconciliation found, the
//! client sees `Unauthenticated`. The precise cause only goes to the log.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::debug;

use super::reconcile::{reconcile, Reconciliation};
use super::roles::Role;
use super::session::CurrentSession;
use super::SESSION_TOKEN_HEADER;
use crate::error::AppError;
use crate::state::AppState;

/// Admit any caller with a live session, whatever their role.
pub async fn require_authenticated(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    authorize(Role::Public, state, jar, request, next).await
}

/// Admit callers holding the `user` role or above.
pub async fn require_user(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    authorize(Role::User, state, jar, request, next).await
}

/// Admit administrators only.
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    authorize(Role::Admin, state, jar, request, next).await
}

async fn authorize(
    required: Role,
    state: AppState,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = presented_token(request.headers(), &jar);
    let outcome = reconcile(
        token.as_deref(),
        state.sessions.as_ref(),
        state.auth.as_ref(),
        state.admin.as_ref(),
        Utc::now(),
    )
    .await;

    if let Err(error) = gate(&outcome, required) {
        debug!(
            reason = outcome.reason,
            path = %request.uri().path(),
            "request denied"
        );
        return error.into_response();
    }

    if let Some(session) = outcome.session {
        request.extensions_mut().insert(session);
    }

    next.run(request).await
}

/// Decide admission from a finished reconciliation.
fn gate(outcome: &Reconciliation, required: Role) -> Result<(), AppError> {
    if !outcome.authenticated {
        return Err(AppError::unauthenticated());
    }
    if !outcome.role.has_privilege(required) {
        return Err(AppError::unauthorized());
    }
    Ok(())
}

/// The session token travels in the `AUTH-ACCESS-TOKEN` header, with a
/// cookie of the same name as the browser fallback. Header wins.
pub fn presented_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(value) = headers.get(SESSION_TOKEN_HEADER) {
        if let Ok(value) = value.to_str() {
            return Some(value.to_string());
        }
    }
    jar.get(SESSION_TOKEN_HEADER)
        .map(|cookie| cookie.value().to_string())
}
