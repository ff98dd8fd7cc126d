// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use session_broker::api;
use session_broker::config::AppConfig;
use session_broker::providers::supabase::{SupabaseAdminClient, SupabaseClient};
use session_broker::state::AppState;
use session_broker::storage::error_log::ErrorLogRepository;
use session_broker::storage::sessions::RedbSessionStore;
use session_broker::sweeper::SessionSweeper;

/// `RUST_LOG` controls the filter; `LOG_FORMAT=json` switches to structured
/// output for log shippers.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AppConfig::from_env().expect("configuration is incomplete");
    info!(
        environment = ?config.environment,
        data_dir = %config.data_dir.display(),
        "configuration loaded"
    );

    let sessions = Arc::new(
        RedbSessionStore::open(&config.session_db_path()).expect("failed to open session store"),
    );
    let auth =
        Arc::new(SupabaseClient::from_env().expect("Supabase client configuration is incomplete"));
    let admin = Arc::new(
        SupabaseAdminClient::from_env().expect("Supabase admin configuration is incomplete"),
    );
    let error_log = ErrorLogRepository::new(config.error_log_dir());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("failed to parse bind address");

    let state = AppState::new(config, sessions.clone(), auth, admin, error_log);

    let shutdown = CancellationToken::new();
    tokio::spawn(SessionSweeper::new(sessions).run(shutdown.clone()));

    let app = api::router(state);

    info!("Session broker listening on http://{addr} (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("server failed");
}

/// Resolves on ctrl-c and cancels the background tasks, after which the
/// server stops accepting and drains in-flight requests.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    info!("Shutdown signal received");
    shutdown.cancel();
}
