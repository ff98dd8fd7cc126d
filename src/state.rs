// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::providers::{AdminAuthProvider, AuthProvider};
use crate::storage::{ErrorLogRepository, SessionStore};

/// Shared handles behind every handler and middleware. The provider and
/// store fields are trait objects so tests can swap in doubles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub admin: Arc<dyn AdminAuthProvider>,
    pub error_log: Arc<ErrorLogRepository>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
        auth: Arc<dyn AuthProvider>,
        admin: Arc<dyn AdminAuthProvider>,
        error_log: ErrorLogRepository,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            auth,
            admin,
            error_log: Arc::new(error_log),
        }
    }
}
