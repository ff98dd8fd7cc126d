// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supabase GoTrue REST integration.
//!
//! Plain HTTP against `{SUPABASE_URL}/auth/v1`. The restricted client
//! authenticates with the anon key plus, where a user is involved, that
//! user's bearer token. The admin client authenticates with the service
//! role key and must never be constructed from request input.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{AdminAuthProvider, AuthProvider, CreateUserRequest};
use crate::error::AppError;
use crate::models::{UpstreamSession, UpstreamUser};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Role stamped onto accounts created through registration.
const DEFAULT_SIGNUP_ROLE: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("Supabase configuration missing: {0}")]
    MissingConfig(String),

    #[error("Supabase request failed: {0}")]
    Request(String),

    #[error("Supabase rejected the call: {0}")]
    Rejected(String),

    #[error("Supabase response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<SupabaseError> for AppError {
    fn from(error: SupabaseError) -> Self {
        match error {
            SupabaseError::MissingConfig(_) => AppError::internal(),
            other => AppError::supabase(json!({ "detail": other.to_string() })),
        }
    }
}

// =============================================================================
// Restricted Client
// =============================================================================

/// Anon-key GoTrue client.
#[derive(Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    http: Client,
}

impl SupabaseClient {
    pub fn from_env() -> Result<Self, SupabaseError> {
        let base_url = env_required("SUPABASE_URL")?;
        let anon_key = env_required("SUPABASE_ANON_KEY")?;
        Ok(Self {
            base_url,
            anon_key,
            http: build_http_client()?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        build_endpoint(&self.base_url, path)
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UpstreamSession, SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("/token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("password grant failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("password grant", response).await);
        }

        response.json().await.map_err(|e| {
            SupabaseError::InvalidResponse(format!("password grant returned invalid JSON: {e}"))
        })
    }

    async fn install_session(
        &self,
        access_token: &str,
        _refresh_token: &str,
    ) -> Result<UpstreamUser, SupabaseError> {
        let response = self
            .http
            .get(self.endpoint("/user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("user lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("user lookup", response).await);
        }

        response.json().await.map_err(|e| {
            SupabaseError::InvalidResponse(format!("user lookup returned invalid JSON: {e}"))
        })
    }

    async fn redeem_one_time_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<UpstreamSession, SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("/verify"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "type": "email", "email": email, "token": code }))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("code redemption failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("code redemption", response).await);
        }

        response.json().await.map_err(|e| {
            SupabaseError::InvalidResponse(format!("code redemption returned invalid JSON: {e}"))
        })
    }

    async fn resend_signup_confirmation(&self, email: &str) -> Result<(), SupabaseError> {
        let response = self
            .http
            .post(self.endpoint("/resend"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("confirmation resend failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("confirmation resend", response).await);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), SupabaseError> {
        let response = self
            .http
            .put(self.endpoint("/user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&json!({ "password": new_password }))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("password update failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("password update", response).await);
        }
        Ok(())
    }
}

// =============================================================================
// Admin Client
// =============================================================================

/// Service-key GoTrue client.
#[derive(Clone)]
pub struct SupabaseAdminClient {
    base_url: String,
    service_role_key: String,
    reset_redirect_url: Option<String>,
    http: Client,
}

impl SupabaseAdminClient {
    pub fn from_env() -> Result<Self, SupabaseError> {
        let base_url = env_required("SUPABASE_URL")?;
        let service_role_key = env_required("SUPABASE_SERVICE_ROLE_KEY")?;
        let reset_redirect_url = env_optional("RESET_PASSWORD_REDIRECT_URL");
        Ok(Self {
            base_url,
            service_role_key,
            reset_redirect_url,
            http: build_http_client()?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        build_endpoint(&self.base_url, path)
    }

    fn authorized_post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.endpoint(path))
            .header("apikey", &self.service_role_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.service_role_key),
            )
    }
}

#[async_trait]
impl AdminAuthProvider for SupabaseAdminClient {
    async fn issue_one_time_link(&self, email: &str) -> Result<String, SupabaseError> {
        let response = self
            .authorized_post("/admin/generate_link")
            .json(&json!({ "type": "magiclink", "email": email }))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("link generation failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("link generation", response).await);
        }

        let body: Value = response.json().await.map_err(|e| {
            SupabaseError::InvalidResponse(format!("link generation returned invalid JSON: {e}"))
        })?;

        extract_email_otp(&body)
            .map(str::to_string)
            .ok_or_else(|| {
                SupabaseError::InvalidResponse("missing email_otp in generated link".to_string())
            })
    }

    async fn create_user(
        &self,
        request: CreateUserRequest<'_>,
    ) -> Result<UpstreamUser, SupabaseError> {
        let response = self
            .authorized_post("/admin/users")
            .json(&build_create_user_payload(&request))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("user creation failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("user creation", response).await);
        }

        response.json().await.map_err(|e| {
            SupabaseError::InvalidResponse(format!("user creation returned invalid JSON: {e}"))
        })
    }

    async fn send_password_recovery(&self, email: &str) -> Result<(), SupabaseError> {
        let mut request = self
            .authorized_post("/recover")
            .json(&json!({ "email": email }));
        if let Some(redirect) = &self.reset_redirect_url {
            request = request.query(&[("redirect_to", redirect.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SupabaseError::Request(format!("recovery email failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("recovery email", response).await);
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn build_http_client() -> Result<Client, SupabaseError> {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| SupabaseError::Request(format!("failed to build HTTP client: {e}")))
}

fn build_endpoint(base_url: &str, path: &str) -> String {
    format!("{}/auth/v1{}", base_url.trim_end_matches('/'), path)
}

/// Turn a non-2xx response into a `Rejected` error carrying the upstream
/// message, which callers match on to classify credential failures.
async fn reject(context: &str, response: reqwest::Response) -> SupabaseError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| extract_error_message(&value).map(str::to_string))
        .unwrap_or_else(|| format!("{context} returned {status}"));
    SupabaseError::Rejected(message)
}

/// GoTrue error bodies are not uniform across endpoints and versions; probe
/// the known spellings in order.
fn extract_error_message(body: &Value) -> Option<&str> {
    body.get("msg")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.get("error_description").and_then(Value::as_str))
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
}

/// The one-time code moved between GoTrue versions; newer ones nest it under
/// `properties`.
fn extract_email_otp(body: &Value) -> Option<&str> {
    body.pointer("/properties/email_otp")
        .and_then(Value::as_str)
        .or_else(|| body.get("email_otp").and_then(Value::as_str))
}

fn build_create_user_payload(request: &CreateUserRequest<'_>) -> Value {
    json!({
        "email": request.email,
        "password": request.password,
        "email_confirm": false,
        "user_metadata": {
            "name": request.name,
            "surname": request.surname,
            "username": request.username,
        },
        "app_metadata": {
            "role": DEFAULT_SIGNUP_ROLE,
        },
    })
}

fn env_required(name: &str) -> Result<String, SupabaseError> {
    env_optional(name).ok_or_else(|| SupabaseError::MissingConfig(name.to_string()))
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}
