// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Storage Module
//!
//! Everything this service keeps on disk lives under `DATA_DIR`:
//!
//! ```text
//! /data/
//!   sessions.redb     # Brokered sessions (embedded ACID store)
//!   errors/
//!     {date}.jsonl    # Daily error records, one JSON object per line
//! ```
//!
//! Sessions are the authority for who is logged in; the upstream provider is
//! consulted but never trusted to outlive `expires_at`. Error records are
//! best-effort and fully redacted before they reach disk.

pub mod error_log;
pub mod sessions;

pub use error_log::{ErrorLogRepository, ErrorRecord};
pub use sessions::{RedbSessionStore, SessionStore, StoreError, StoreResult};
