// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session reconciliation.
//!
//! Every request through the auth middleware funnels into [`reconcile`]:
//! given the presented token and the clock, decide whether the caller is
//! authenticated, repairing the upstream session when the broker's record
//! is still live but the credentials inside it have gone stale.
//!
//! The engine judges `expires_at` itself; the store hands records back
//! as-is. An expired record is dead on arrival and is never repaired.
//! Repair is invisible to the client on success and fails closed: any
//! slip along the way, including a failed write-back, leaves the request
//! unauthenticated and the store untouched.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::auth::roles::Role;
use crate::auth::session::CurrentSession;
use crate::models::SessionRecord;
use crate::providers::{AdminAuthProvider, AuthProvider};
use crate::storage::SessionStore;

/// Outcome of one reconciliation pass. Middleware reads it; nothing
/// rewrites it afterwards.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub authenticated: bool,
    pub role: Role,
    /// Short cause for logs. Never sent to clients.
    pub reason: &'static str,
    pub session: Option<CurrentSession>,
}

impl Reconciliation {
    fn denied(reason: &'static str) -> Self {
        Self {
            authenticated: false,
            role: Role::Public,
            reason,
            session: None,
        }
    }

    fn granted(reason: &'static str, session: CurrentSession) -> Self {
        Self {
            authenticated: true,
            role: session.role,
            reason,
            session: Some(session),
        }
    }
}

/// Reconcile one presented token against the store and the upstream.
pub async fn reconcile(
    token: Option<&str>,
    store: &dyn SessionStore,
    auth: &dyn AuthProvider,
    admin: &dyn AdminAuthProvider,
    now: DateTime<Utc>,
) -> Reconciliation {
    let token = match token.map(str::trim) {
        Some(token) if !token.is_empty() => token,
        _ => return Reconciliation::denied("no session token presented"),
    };

    let record = match store.get(token).await {
        Ok(Some(record)) => record,
        Ok(None) => return Reconciliation::denied("no record for token"),
        Err(error) => {
            warn!(error = %error, "session lookup failed");
            return Reconciliation::denied("session store unavailable");
        }
    };

    if record.expires_at <= now {
        return Reconciliation::denied("session past its expiry");
    }

    if auth
        .install_session(&record.access_token, &record.refresh_token)
        .await
        .is_ok()
    {
        return Reconciliation::granted(
            "session and upstream both valid",
            CurrentSession::new(token, record),
        );
    }

    debug!("stored credentials rejected upstream, attempting repair");
    repair(token, record, store, auth, admin).await
}

/// Mint fresh upstream credentials under the same token.
///
/// Only the credentials and the user snapshot are replaced; the record's
/// absolute deadline carries over unchanged.
async fn repair(
    token: &str,
    record: SessionRecord,
    store: &dyn SessionStore,
    auth: &dyn AuthProvider,
    admin: &dyn AdminAuthProvider,
) -> Reconciliation {
    let Some(email) = record.user.email.clone() else {
        return Reconciliation::denied("record has no email to repair with");
    };

    let code = match admin.issue_one_time_link(&email).await {
        Ok(code) => code,
        Err(error) => {
            warn!(error = %error, "one-time link issuance failed");
            return Reconciliation::denied("one-time link issuance failed");
        }
    };

    let fresh = match auth.redeem_one_time_code(&email, &code).await {
        Ok(session) => session,
        Err(error) => {
            warn!(error = %error, "one-time code redemption failed");
            return Reconciliation::denied("one-time code redemption failed");
        }
    };

    let repaired = SessionRecord {
        access_token: fresh.access_token,
        refresh_token: fresh.refresh_token,
        user: fresh.user,
        expires_at: record.expires_at,
    };

    if let Err(error) = store.put(token, &repaired).await {
        warn!(error = %error, "repaired session could not be persisted");
        return Reconciliation::denied("repaired session could not be persisted");
    }

    Reconciliation::granted(
        "upstream session repaired",
        CurrentSession::new(token, repaired),
    )
}
