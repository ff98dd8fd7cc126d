// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::require_authenticated, SESSION_TOKEN_HEADER},
    error::AppError,
    models::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
        MessageResponse, RegisterRequest, ResetPasswordRequest, SessionCheckResponse,
        UserDataResponse,
    },
    state::AppState,
    storage::error_log::ErrorRecord,
};

pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    // Reconciliation runs as a route layer, so these handlers only ever see
    // requests that already carry a valid session.
    let session_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/check-session", get(auth::check_session))
        .route("/auth/user", get(auth::get_user))
        .route("/auth/change-password", post(auth::change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_authenticated,
        ));

    let v1_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .merge(session_routes)
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state, capture_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Persist a record of every error response served.
///
/// Handlers stash the [`AppError`] in the response extensions when they
/// render it. This layer picks it up, attaches request context, and appends
/// it to the error log. Recording is best-effort: a failed write is logged
/// and the response goes out regardless.
async fn capture_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers());

    let response = next.run(request).await;

    if let Some(error) = response.extensions().get::<AppError>() {
        let record = ErrorRecord::new(error)
            .with_request(&method, &path)
            .with_ip(ip);
        if let Err(log_error) = state.error_log.record(&record) {
            warn!(error = %log_error, "failed to persist error record");
        }
    }

    response
}

/// Client address as the proxy reports it. Cloudflare's header wins; behind
/// anything else the first `x-forwarded-for` hop is the client.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|value| value.to_str().ok())
    {
        return Some(ip.to_string());
    }
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::logout,
        auth::check_session,
        auth::get_user,
        auth::register,
        auth::forgot_password,
        auth::reset_password,
        auth::change_password,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            ChangePasswordRequest,
            MessageResponse,
            LoginResponse,
            SessionCheckResponse,
            UserDataResponse
        )
    ),
    modifiers(&SessionTokenSecurity),
    tags(
        (name = "Auth", description = "Login, registration, and session management"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

/// Registers the opaque-token header as an API-key scheme so protected
/// operations can reference it by name.
struct SessionTokenSecurity;

impl Modify for SessionTokenSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(SESSION_TOKEN_HEADER))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::state_with_fakes;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let harness = state_with_fakes();
        let app = router(harness.state.clone());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_document_registers_the_session_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components should be generated");
        assert!(components.security_schemes.contains_key("session_token"));
    }

    #[test]
    fn client_ip_prefers_the_cloudflare_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", "203.0.113.9".parse().unwrap());
        headers.insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());

        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn client_ip_takes_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());

        assert_eq!(client_ip(&headers).as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn client_ip_is_absent_without_proxy_headers() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
