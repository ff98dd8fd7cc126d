// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::storage::SessionStore;

/// Probe key for the session store check. Minted tokens are far longer,
/// so this can never shadow a live session.
const STORE_PROBE_TOKEN: &str = "health-probe";

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Data directory availability.
    pub data_dir: String,
    /// Session store availability.
    pub session_store: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Check if the data directory exists and is accessible.
fn check_data_dir(state: &AppState) -> String {
    if state.config.data_dir.exists() {
        "ok".to_string()
    } else {
        "missing".to_string()
    }
}

/// Check if the session store answers. A miss for the probe key is a
/// healthy answer; only a store error fails the check.
async fn check_session_store(state: &AppState) -> String {
    match state.sessions.get(STORE_PROBE_TOKEN).await {
        Ok(_) => "ok".to_string(),
        Err(_) => "unavailable".to_string(),
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails. The upstream
/// identity provider is deliberately not probed here, so a Supabase
/// outage degrades logins without flapping this endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let data_dir = check_data_dir(&state);
    let session_store = check_session_store(&state).await;

    let all_ok = data_dir == "ok" && session_store == "ok";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            data_dir,
            session_store,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if all dependencies are available.
/// Use for Kubernetes readiness probes.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::state_with_fakes;

    #[tokio::test]
    async fn liveness_always_answers_ok() {
        let response = liveness().await;
        assert_eq!(response.0.status, "ok");
    }

    #[tokio::test]
    async fn health_reports_ok_when_every_check_passes() {
        let harness = state_with_fakes();

        let (status, body) = health(State(harness.state.clone())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0.status, "ok");
        assert_eq!(body.0.checks.data_dir, "ok");
        assert_eq!(body.0.checks.session_store, "ok");
    }

    #[tokio::test]
    async fn health_degrades_when_the_store_is_unusable() {
        let harness = state_with_fakes();
        harness
            .sessions
            .fail_get
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let (status, body) = health(State(harness.state.clone())).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.0.status, "degraded");
        assert_eq!(body.0.checks.session_store, "unavailable");
        assert_eq!(body.0.checks.data_dir, "ok");
    }

    #[tokio::test]
    async fn readiness_mirrors_the_full_health_check() {
        let harness = state_with_fakes();

        let (status, body) = readiness(State(harness.state.clone())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0.checks.service, "ok");
    }
}
