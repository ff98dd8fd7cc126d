// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded session store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sessions`: opaque token → serialized SessionRecord (JSON bytes)
//!
//! The store is a dumb key-value map: `get` returns whatever is under the
//! key, expired or not. Judging `expires_at` is the reconciliation engine's
//! job; evicting dead records is the sweeper's, via `purge_expired`. A read
//! never turns into a write.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::json;

use crate::error::AppError;
use crate::models::SessionRecord;

/// Primary table: opaque session token → serialized SessionRecord (JSON bytes).
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Backend failure with no structured form (closed or corrupt store).
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        AppError::internal().with_data(json!({ "detail": error.to_string() }))
    }
}

// =============================================================================
// SessionStore Trait
// =============================================================================

/// Persistence seam for brokered sessions.
///
/// Callers treat any `Err` as "store unusable" and fail closed; the trait
/// never distinguishes recoverable from fatal backend errors.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the record under `token`, if any. No expiry judgment here.
    async fn get(&self, token: &str) -> StoreResult<Option<SessionRecord>>;

    /// Insert or replace the record under `token`. Last writer wins.
    async fn put(&self, token: &str, record: &SessionRecord) -> StoreResult<()>;

    /// Remove the record under `token`. Removing an absent token is fine.
    async fn delete(&self, token: &str) -> StoreResult<()>;

    /// Remove every record past its `expires_at`. Returns how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

// =============================================================================
// RedbSessionStore
// =============================================================================

/// Embedded ACID session store.
pub struct RedbSessionStore {
    db: Database,
}

impl RedbSessionStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl SessionStore for RedbSessionStore {
    async fn get(&self, token: &str) -> StoreResult<Option<SessionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        match table.get(token)? {
            Some(value) => {
                let record: SessionRecord = serde_json::from_slice(value.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, token: &str, record: &SessionRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(token, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn delete(&self, token: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.remove(token)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(SESSIONS)?;

            // Collect first; the table cannot be mutated mid-iteration.
            let mut dead: Vec<String> = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                match serde_json::from_slice::<SessionRecord>(value.value()) {
                    Ok(record) if record.expires_at > now => {}
                    // Expired or unreadable records both go.
                    _ => dead.push(key.value().to_string()),
                }
            }

            for token in &dead {
                table.remove(token.as_str())?;
            }
            dead.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}

// =============================================================================
// Tests
// =============================================================================
