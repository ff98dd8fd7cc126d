// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Brokering
//!
//! The broker never hands upstream credentials to clients. Instead:
//!
//! 1. Login exchanges credentials upstream and stores the resulting
//!    tokens server-side under a freshly minted opaque token.
//! 2. The client carries only that opaque token, in the
//!    `AUTH-ACCESS-TOKEN` header or a cookie of the same name.
//! 3. On every guarded request, reconciliation looks the token up,
//!    checks the record's absolute deadline and re-validates the stored
//!    credentials upstream, invisibly re-minting them when they have
//!    gone stale.
//!
//! ## Security
//!
//! - The opaque token is 96 bytes of system randomness; it encodes
//!   nothing and signs nothing
//! - A session's `expires_at` is fixed at login and never extended
//! - Every repair failure, including a failed write-back, denies the
//!   request rather than guessing
//! - Role checks ride on the same middleware pass as authentication

pub mod middleware;
pub mod reconcile;
pub mod roles;
pub mod session;

pub use reconcile::{reconcile, Reconciliation};
pub use roles::Role;
pub use session::CurrentSession;

/// Header carrying the opaque session token. The cookie fallback uses
/// the same name.
pub const SESSION_TOKEN_HEADER: &str = "AUTH-ACCESS-TOKEN";
