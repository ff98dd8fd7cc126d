// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Sweeper
//!
//! Background task that periodically evicts expired session records from the
//! store. Reconciliation never deletes: an expired record is simply refused
//! at the door, and this sweeper is the only thing that actually removes it.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown, so a
//! sweep in flight finishes before the process exits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::sessions::SessionStore;

/// Default interval between sweeps. Expired records are harmless in the
/// meantime, they just occupy space, so hourly is plenty.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Background eviction of expired session records.
pub struct SessionSweeper {
    sessions: Arc<dyn SessionStore>,
    sweep_interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            sessions,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Session sweeper shutting down");
                return;
            }

            self.sweep_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: drop every record past its deadline. A store error
    /// is logged and swallowed; the next interval retries from scratch.
    pub async fn sweep_once(&self) {
        match self.sessions.purge_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Session sweeper: purged expired sessions"),
            Err(error) => warn!(error = %error, "Session sweeper: purge failed"),
        }
    }
}
