// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upstream identity provider integrations.
//!
//! Two seams, split by privilege. [`AuthProvider`] covers everything the
//! restricted (anon-key) client may do; [`AdminAuthProvider`] covers the
//! elevated (service-key) calls. Handlers and the reconciliation engine only
//! ever see these traits, so tests swap in fakes without touching HTTP.

use async_trait::async_trait;

use crate::models::{UpstreamSession, UpstreamUser};

pub mod supabase;

pub use supabase::{SupabaseAdminClient, SupabaseClient, SupabaseError};

/// Payload for elevated user creation.
pub struct CreateUserRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub username: &'a str,
    pub name: &'a str,
    pub surname: &'a str,
}

/// Restricted upstream operations, performed with the public key.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a full upstream session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UpstreamSession, SupabaseError>;

    /// Prove a token pair is still honored upstream. Returns the user the
    /// tokens belong to; any error means the pair is stale or revoked.
    async fn install_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<UpstreamUser, SupabaseError>;

    /// Redeem a one-time email code for a fresh upstream session.
    async fn redeem_one_time_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<UpstreamSession, SupabaseError>;

    /// Trigger a new signup confirmation email.
    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), SupabaseError>;

    /// Set a new password for the user the access token belongs to.
    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), SupabaseError>;
}

/// Elevated upstream operations, performed with the service key. Never
/// reachable from request input except through the fixed flows that need
/// them.
#[async_trait]
pub trait AdminAuthProvider: Send + Sync {
    /// Issue a one-time login link for the email and return its code. The
    /// link itself is never delivered anywhere; only the code is used, by
    /// the session repair flow.
    async fn issue_one_time_link(&self, email: &str) -> Result<String, SupabaseError>;

    /// Create a user account, unconfirmed, with the default role.
    async fn create_user(&self, request: CreateUserRequest<'_>)
        -> Result<UpstreamUser, SupabaseError>;

    /// Send a password recovery email.
    async fn send_password_recovery(&self, email: &str) -> Result<(), SupabaseError>;
}
