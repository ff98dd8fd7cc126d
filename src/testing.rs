// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory doubles for the storage and provider seams.
//!
//! The session engine and the handlers only ever see [`SessionStore`],
//! [`AuthProvider`] and [`AdminAuthProvider`], so tests swap in these
//! fakes instead of redb and GoTrue. Behavior slots hold a `Result`; an
//! `Err` message surfaces as [`SupabaseError::Rejected`] with that
//! message, which is also how handler tests drive the upstream-message
//! matching. Call counters let a test assert which upstream calls a code
//! path did or, just as often, did not make.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::config::{AppConfig, Environment};
use crate::models::{AppMetadata, SessionRecord, UpstreamSession, UpstreamUser};
use crate::providers::{AdminAuthProvider, AuthProvider, CreateUserRequest, SupabaseError};
use crate::state::AppState;
use crate::storage::{ErrorLogRepository, SessionStore, StoreError, StoreResult};

// =============================================================================
// Sample Data
// =============================================================================

pub fn sample_user(email: &str, role: &str) -> UpstreamUser {
    let mut user_metadata = Map::new();
    user_metadata.insert("username".into(), Value::String("sampler".into()));
    user_metadata.insert("name".into(), Value::String("Sam".into()));
    user_metadata.insert("surname".into(), Value::String("Pler".into()));
    UpstreamUser {
        id: "00000000-0000-4000-8000-000000000001".into(),
        email: Some(email.to_string()),
        user_metadata,
        app_metadata: AppMetadata {
            role: Some(role.to_string()),
        },
    }
}

pub fn sample_upstream_session(email: &str, role: &str) -> UpstreamSession {
    UpstreamSession {
        access_token: "upstream-access".into(),
        refresh_token: "upstream-refresh".into(),
        user: sample_user(email, role),
    }
}

pub fn sample_record(email: &str, role: &str, expires_at: DateTime<Utc>) -> SessionRecord {
    SessionRecord {
        access_token: "stored-access".into(),
        refresh_token: "stored-refresh".into(),
        user: sample_user(email, role),
        expires_at,
    }
}

/// A record that is still a month away from its deadline.
pub fn live_record(email: &str, role: &str) -> SessionRecord {
    sample_record(email, role, Utc::now() + Duration::days(30))
}

// =============================================================================
// Session Store Fake
// =============================================================================

/// HashMap-backed [`SessionStore`] with injectable failures.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
    pub fail_get: AtomicBool,
    pub fail_put: AtomicBool,
    pub get_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the trait and its counters.
    pub fn seed(&self, token: &str, record: SessionRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(token.to_string(), record);
    }

    /// Copy of the whole map, for before/after comparisons.
    pub fn snapshot(&self) -> HashMap<String, SessionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, token: &str) -> StoreResult<Option<SessionRecord>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected get failure".into()));
        }
        Ok(self.records.lock().unwrap().get(token).cloned())
    }

    async fn put(&self, token: &str, record: &SessionRecord) -> StoreResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected put failure".into()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(token.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, token: &str) -> StoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().remove(token);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        Ok(before - records.len())
    }
}

// =============================================================================
// Provider Fakes
// =============================================================================

/// Scripted [`AuthProvider`]. Every slot starts rejecting so a test only
/// sees the outcomes it configured.
pub struct FakeAuthProvider {
    sign_in: Mutex<Result<UpstreamSession, String>>,
    install: Mutex<Result<UpstreamUser, String>>,
    redeem: Mutex<Result<UpstreamSession, String>>,
    update_password: Mutex<Result<(), String>>,
    /// Access tokens passed to `update_password`, in call order.
    pub update_password_tokens: Mutex<Vec<String>>,
    pub sign_in_calls: AtomicUsize,
    pub install_calls: AtomicUsize,
    pub redeem_calls: AtomicUsize,
    pub resend_calls: AtomicUsize,
    pub update_password_calls: AtomicUsize,
}

impl FakeAuthProvider {
    pub fn new() -> Self {
        Self {
            sign_in: Mutex::new(Err("sign-in not scripted".into())),
            install: Mutex::new(Err("install not scripted".into())),
            redeem: Mutex::new(Err("redeem not scripted".into())),
            update_password: Mutex::new(Ok(())),
            update_password_tokens: Mutex::new(Vec::new()),
            sign_in_calls: AtomicUsize::new(0),
            install_calls: AtomicUsize::new(0),
            redeem_calls: AtomicUsize::new(0),
            resend_calls: AtomicUsize::new(0),
            update_password_calls: AtomicUsize::new(0),
        }
    }

    pub fn sign_in_succeeds(&self, session: UpstreamSession) {
        *self.sign_in.lock().unwrap() = Ok(session);
    }

    pub fn sign_in_fails(&self, message: &str) {
        *self.sign_in.lock().unwrap() = Err(message.to_string());
    }

    pub fn install_succeeds(&self, user: UpstreamUser) {
        *self.install.lock().unwrap() = Ok(user);
    }

    pub fn install_fails(&self, message: &str) {
        *self.install.lock().unwrap() = Err(message.to_string());
    }

    pub fn redeem_succeeds(&self, session: UpstreamSession) {
        *self.redeem.lock().unwrap() = Ok(session);
    }

    pub fn redeem_fails(&self, message: &str) {
        *self.redeem.lock().unwrap() = Err(message.to_string());
    }

    pub fn update_password_fails(&self, message: &str) {
        *self.update_password.lock().unwrap() = Err(message.to_string());
    }
}

impl Default for FakeAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<UpstreamSession, SupabaseError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_in
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }

    async fn install_session(
        &self,
        _access_token: &str,
        _refresh_token: &str,
    ) -> Result<UpstreamUser, SupabaseError> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        self.install
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }

    async fn redeem_one_time_code(
        &self,
        _email: &str,
        _code: &str,
    ) -> Result<UpstreamSession, SupabaseError> {
        self.redeem_calls.fetch_add(1, Ordering::SeqCst);
        self.redeem
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }

    async fn resend_signup_confirmation(&self, _email: &str) -> Result<(), SupabaseError> {
        self.resend_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        _new_password: &str,
    ) -> Result<(), SupabaseError> {
        self.update_password_calls.fetch_add(1, Ordering::SeqCst);
        self.update_password_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.update_password
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }
}

/// Scripted [`AdminAuthProvider`].
pub struct FakeAdminProvider {
    issue_link: Mutex<Result<String, String>>,
    create_user: Mutex<Result<UpstreamUser, String>>,
    recovery: Mutex<Result<(), String>>,
    pub issue_link_calls: AtomicUsize,
    pub create_user_calls: AtomicUsize,
    pub recovery_calls: AtomicUsize,
}

impl FakeAdminProvider {
    pub fn new() -> Self {
        Self {
            issue_link: Mutex::new(Err("issue-link not scripted".into())),
            create_user: Mutex::new(Err("create-user not scripted".into())),
            recovery: Mutex::new(Ok(())),
            issue_link_calls: AtomicUsize::new(0),
            create_user_calls: AtomicUsize::new(0),
            recovery_calls: AtomicUsize::new(0),
        }
    }

    pub fn issue_link_succeeds(&self, code: &str) {
        *self.issue_link.lock().unwrap() = Ok(code.to_string());
    }

    pub fn issue_link_fails(&self, message: &str) {
        *self.issue_link.lock().unwrap() = Err(message.to_string());
    }

    pub fn create_user_succeeds(&self, user: UpstreamUser) {
        *self.create_user.lock().unwrap() = Ok(user);
    }

    pub fn create_user_fails(&self, message: &str) {
        *self.create_user.lock().unwrap() = Err(message.to_string());
    }

    pub fn recovery_fails(&self, message: &str) {
        *self.recovery.lock().unwrap() = Err(message.to_string());
    }
}

impl Default for FakeAdminProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminAuthProvider for FakeAdminProvider {
    async fn issue_one_time_link(&self, _email: &str) -> Result<String, SupabaseError> {
        self.issue_link_calls.fetch_add(1, Ordering::SeqCst);
        self.issue_link
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }

    async fn create_user(
        &self,
        _request: CreateUserRequest<'_>,
    ) -> Result<UpstreamUser, SupabaseError> {
        self.create_user_calls.fetch_add(1, Ordering::SeqCst);
        self.create_user
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }

    async fn send_password_recovery(&self, _email: &str) -> Result<(), SupabaseError> {
        self.recovery_calls.fetch_add(1, Ordering::SeqCst);
        self.recovery
            .lock()
            .unwrap()
            .clone()
            .map_err(SupabaseError::Rejected)
    }
}

// =============================================================================
// Wired State
// =============================================================================

/// An [`AppState`] wired to fakes, with handles to script them and read
/// their counters. The `TempDir` keeps the error log directory alive.
pub struct TestHarness {
    pub state: AppState,
    pub sessions: Arc<MemorySessionStore>,
    pub auth: Arc<FakeAuthProvider>,
    pub admin: Arc<FakeAdminProvider>,
    pub data_dir: TempDir,
}

pub fn test_config(data_dir: &Path) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        data_dir: data_dir.to_path_buf(),
        environment: Environment::Production,
        session_ttl: Duration::days(30),
        cookie_secure: false,
    }
}

pub fn state_with_fakes() -> TestHarness {
    let data_dir = TempDir::new().unwrap();
    let sessions = Arc::new(MemorySessionStore::new());
    let auth = Arc::new(FakeAuthProvider::new());
    let admin = Arc::new(FakeAdminProvider::new());
    let config = test_config(data_dir.path());
    let error_log = ErrorLogRepository::new(config.error_log_dir());
    let state = AppState::new(
        config,
        sessions.clone(),
        auth.clone(),
        admin.clone(),
        error_log,
    );
    TestHarness {
        state,
        sessions,
        auth,
        admin,
        data_dir,
    }
}
