// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session Broker - Session & Request Authorization Service
//!
//! This crate brokers opaque client sessions in front of the Supabase auth
//! API. Sessions live in an embedded key-value store under random tokens
//! that encode nothing, and every authenticated request is reconciled
//! against the upstream provider before a handler sees it.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session reconciliation, roles, and route guards
//! - `providers` - Supabase auth API clients
//! - `storage` - Embedded session store (redb) and error log

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
pub mod sweeper;
pub mod token;

#[cfg(test)]
pub mod testing;
