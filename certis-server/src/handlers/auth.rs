//! Operator login, logout and identity handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::auth::{authenticate, clear_session_cookie, session_cookie, session_token, AdminSession};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::AdminIdentity;

/// Login credentials
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "registrar")]
    #[serde(default)]
    pub username: String,
    #[schema(example = "correct horse battery staple")]
    #[serde(default)]
    pub password: String,
}

/// Public view of an admin identity (never includes the password hash)
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminResponse {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "registrar")]
    pub username: String,
    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub created_at: DateTime<Utc>,
}

impl From<AdminIdentity> for AdminResponse {
    fn from(admin: AdminIdentity) -> Self {
        Self {
            id: admin.id,
            username: admin.username,
            created_at: admin.created_at,
        }
    }
}

/// Successful login
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque session token, also set as the `certis_session` cookie
    pub token: String,
    #[schema(value_type = String, example = "Bearer")]
    pub token_type: &'static str,
    /// Session lifetime in seconds
    #[schema(example = 28800)]
    pub expires_in: u64,
    pub admin: AdminResponse,
}

/// Logout result
#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    #[schema(example = true)]
    pub logged_out: bool,
}

/// Log in as an operator
///
/// Returns a session token in the body and as an `HttpOnly` cookie. Wrong
/// password and unknown username produce the same 401 response.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let password = Zeroizing::new(request.password);

    let admin = authenticate(&state.admins, request.username.trim(), password).await?;

    let token = state.sessions.create(admin.id, admin.username.clone());
    let ttl = state.sessions.ttl().as_secs();
    let cookie = session_cookie(&token, ttl, state.config.cookie_secure);

    tracing::info!(username = %admin.username, admin_id = %admin.id, "Admin logged in");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            token,
            token_type: "Bearer",
            expires_in: ttl,
            admin: admin.into(),
        }),
    ))
}

/// Log out
///
/// Invalidates the presented session, if any, and clears the cookie.
/// Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Session invalidated", body = LogoutResponse)
    )
)]
pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        if state.sessions.revoke(token) {
            tracing::info!("Admin logged out");
        }
    }

    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))]),
        Json(LogoutResponse { logged_out: true }),
    )
}

/// Current operator
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Authenticated admin", body = AdminResponse),
        (status = 401, description = "Missing, invalid or expired session")
    ),
    security(
        ("session_cookie" = []),
        ("bearer_token" = [])
    )
)]
pub async fn me_handler(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<AdminResponse>, ApiError> {
    let admin = state
        .admins
        .find_by_id(session.admin_id)
        .await?
        .ok_or_else(|| {
            state.sessions.revoke(&session.token);
            ApiError::unauthorized("Admin no longer exists")
        })?;

    Ok(Json(admin.into()))
}
