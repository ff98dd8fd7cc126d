// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints.
//!
//! Login is the only route that mints a session: it exchanges credentials
//! upstream, stores the upstream tokens server-side and hands the client
//! an opaque token, both in the response body and as a cookie. From then
//! on the client presents only that token; the upstream credentials never
//! leave the broker.
//!
//! Upstream rejections are mapped onto stable `AUTH-*` codes by matching
//! the rejection message loosely, because GoTrue wording shifts between
//! versions.

use axum::{extract::State, Json};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::{
    auth::{CurrentSession, Role, SESSION_TOKEN_HEADER},
    error::{AppError, ErrorKind},
    models::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginData, LoginRequest, LoginResponse,
        MessageResponse, RegisterRequest, ResetPasswordRequest, SessionCheckResponse,
        SessionRecord, UpstreamUser, UserDataResponse,
    },
    providers::{AdminAuthProvider, AuthProvider, CreateUserRequest, SupabaseError},
    state::AppState,
    storage::SessionStore,
    token::mint_session_token,
};

// ============================================================================
// Session Cookie
// ============================================================================

fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_TOKEN_HEADER, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_TOKEN_HEADER, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

// ============================================================================
// Handlers
// ============================================================================

/// Exchange email and password for an opaque session token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; opaque session token issued", body = LoginResponse),
        (status = 400, description = "Validation failure or rejected credentials"),
        (status = 500, description = "Upstream or internal failure"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    body.validate()?;

    let upstream = match state
        .auth
        .sign_in_with_password(&body.email, &body.password)
        .await
    {
        Ok(session) => session,
        Err(SupabaseError::Rejected(message)) => {
            return Err(login_rejection(&state, &body.email, &message).await);
        }
        Err(other) => return Err(other.into()),
    };

    let token = mint_session_token()?;
    let record = SessionRecord {
        access_token: upstream.access_token,
        refresh_token: upstream.refresh_token,
        user: upstream.user,
        expires_at: Utc::now() + state.config.session_ttl,
    };
    state.sessions.put(&token, &record).await?;

    info!(user = %record.user.id, "session minted");

    let jar = jar.add(session_cookie(
        token.clone(),
        state.config.session_ttl,
        state.config.cookie_secure,
    ));
    Ok((
        jar,
        Json(LoginResponse {
            status: "success",
            message: "Successfully logged in.",
            data: LoginData {
                access_token: token,
            },
        }),
    ))
}

/// Delete the session and expire the cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    security(("session_token" = [])),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 400, description = "No valid session"),
    )
)]
pub async fn logout(
    session: CurrentSession,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    state.sessions.delete(&session.token).await?;
    let jar = jar.remove(clear_session_cookie());
    Ok((jar, Json(MessageResponse::new("Successfully logged out."))))
}

/// Report that the presented session is valid, and its role.
///
/// The middleware has already reconciled (and possibly repaired) the
/// session by the time this runs, so there is nothing left to check.
#[utoipa::path(
    get,
    path = "/v1/auth/check-session",
    tag = "Auth",
    security(("session_token" = [])),
    responses(
        (status = 200, description = "Session is valid", body = SessionCheckResponse),
        (status = 400, description = "No valid session"),
    )
)]
pub async fn check_session(session: CurrentSession) -> Json<SessionCheckResponse> {
    Json(SessionCheckResponse {
        status: "success",
        message: "Session is valid.",
        role: session.role,
        is_valid: true,
    })
}

/// Profile of the logged-in user, flattened from the session record.
#[utoipa::path(
    get,
    path = "/v1/auth/user",
    tag = "Auth",
    security(("session_token" = [])),
    responses(
        (status = 200, description = "User profile", body = UserDataResponse),
        (status = 400, description = "No valid session"),
    )
)]
pub async fn get_user(session: CurrentSession) -> Json<UserDataResponse> {
    Json(UserDataResponse {
        status: "success",
        message: "User data",
        data: profile_data(&session.record.user, session.role),
    })
}

/// Create an account. Confirmation happens over email before login works.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, confirmation email sent", body = MessageResponse),
        (status = 400, description = "Validation failure or duplicate email"),
        (status = 500, description = "Upstream or internal failure"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()?;

    let request = CreateUserRequest {
        email: &body.email,
        password: &body.password,
        username: &body.username,
        name: &body.name,
        surname: &body.surname,
    };
    if let Err(error) = state.admin.create_user(request).await {
        return Err(register_rejection(error));
    }

    Ok(Json(MessageResponse::new(
        "Successfully registered. Please check your email for verification.",
    )))
}

/// Send a password recovery email.
#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Recovery email sent", body = MessageResponse),
        (status = 400, description = "Validation failure"),
        (status = 500, description = "Upstream or internal failure"),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()?;
    state.admin.send_password_recovery(&body.email).await?;
    Ok(Json(MessageResponse::new(
        "Successfully sent reset password email.",
    )))
}

/// Set a new password using the recovery tokens from the reset email.
///
/// The recovery pair is proven by installing it upstream first; only then
/// is the password updated under that session.
#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation failure"),
        (status = 500, description = "Recovery tokens rejected upstream"),
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()?;
    state
        .auth
        .install_session(&body.access_token, &body.refresh_token)
        .await?;
    state
        .auth
        .update_password(&body.access_token, &body.password)
        .await?;
    Ok(Json(MessageResponse::new("Successfully reset password.")))
}

/// Change the password of the logged-in user.
///
/// The old password is proven by a fresh upstream sign-in; the update then
/// rides on that fresh session's token, not the brokered record's.
#[utoipa::path(
    post,
    path = "/v1/auth/change-password",
    tag = "Auth",
    security(("session_token" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation failure, wrong old password or no valid session"),
        (status = 500, description = "Upstream or internal failure"),
    )
)]
pub async fn change_password(
    session: CurrentSession,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate()?;

    let email = session.record.user.email.clone().unwrap_or_default();
    let fresh = state
        .auth
        .sign_in_with_password(&email, &body.old_password)
        .await
        .map_err(|_| AppError::new("AUTH-004", ErrorKind::Authentication).with_data(json!({})))?;

    state
        .auth
        .update_password(&fresh.access_token, &body.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Successfully changed password.")))
}

// ============================================================================
// Rejection Mapping
// ============================================================================

/// Map an upstream password-grant rejection onto a stable code. An
/// unconfirmed address triggers a fresh confirmation email before the
/// error goes back.
async fn login_rejection(state: &AppState, email: &str, message: &str) -> AppError {
    let lowered = message.to_lowercase();
    if lowered.contains("credentials") {
        return AppError::new("AUTH-002", ErrorKind::Authentication);
    }
    if lowered.contains("confirm") {
        if let Err(error) = state.auth.resend_signup_confirmation(email).await {
            warn!(error = %error, "confirmation resend failed");
        }
        return AppError::new("AUTH-003", ErrorKind::Authentication);
    }
    AppError::supabase(json!({ "detail": message }))
}

fn register_rejection(error: SupabaseError) -> AppError {
    match error {
        SupabaseError::Rejected(message) => {
            let lowered = message.to_lowercase();
            if lowered.contains("unique") || lowered.contains("already") {
                AppError::new("AUTH-001", ErrorKind::Authentication)
            } else {
                AppError::supabase(json!({ "detail": message }))
            }
        }
        other => other.into(),
    }
}

/// Flatten the stored user snapshot into the shape clients expect:
/// email, then the free-form profile fields, then the resolved role.
/// Profile fields win over the explicit email on a key collision; the
/// role always comes from the resolved value.
fn profile_data(user: &UpstreamUser, role: Role) -> Value {
    let mut data = Map::new();
    data.insert(
        "email".to_string(),
        user.email.clone().map(Value::String).unwrap_or(Value::Null),
    );
    for (key, value) in &user.user_metadata {
        data.insert(key.clone(), value.clone());
    }
    data.insert("role".to_string(), Value::String(role.to_string()));
    Value::Object(data)
}
