//! Operator authentication module
//!
//! Provides the `AdminSession` extractor for Axum handlers plus the login and
//! provisioning flows. Sessions are opaque random tokens, accepted either as
//! the `certis_session` cookie or as `Authorization: Bearer <token>`.

mod password;
mod session;

pub use password::{hash_password, verify_login, verify_password};
pub use session::{Session, SessionStore};

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{AdminIdentity, AdminStore, StoreError};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "certis_session";

/// Shortest accepted admin password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted username length
pub const MAX_USERNAME_LEN: usize = 64;

/// Extract the Bearer token from the Authorization header, if any
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Find a cookie value across all `Cookie` headers
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Session token from the request: Bearer header first, then cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_value(headers, SESSION_COOKIE))
}

/// `Set-Cookie` value that delivers a session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Authenticated operator extractor.
///
/// Use this for handlers that require an admin session. Rejects with 401
/// `UNAUTHORIZED` when the token is missing, unknown, revoked or expired.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin_id: Uuid,
    pub username: String,
    pub token: String,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing session"))?;

        let session = state
            .sessions
            .resolve(token)
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

        Ok(AdminSession {
            admin_id: session.admin_id,
            username: session.username,
            token: token.to_string(),
        })
    }
}

/// Check credentials against the admin store.
///
/// Unknown usernames still pay for one Argon2 verification; both failure
/// paths return the same error.
pub async fn authenticate(
    admins: &AdminStore,
    username: &str,
    password: Zeroizing<String>,
) -> Result<AdminIdentity, ApiError> {
    let admin = admins.find_by_username(username).await?;
    let stored = admin.as_ref().map(|a| a.password_hash.clone());

    if verify_login(password, stored).await {
        if let Some(admin) = admin {
            return Ok(admin);
        }
    }

    tracing::warn!(username = %username, "Failed login attempt");
    Err(ApiError::invalid_credentials())
}

/// Errors from admin provisioning
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Username must be 1-{} characters without whitespace", MAX_USERNAME_LEN)]
    InvalidUsername,

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("Admin '{0}' already exists")]
    AlreadyExists(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ProvisionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Create a new admin identity with an Argon2id password hash.
pub async fn provision_admin(
    admins: &AdminStore,
    username: &str,
    password: Zeroizing<String>,
) -> Result<AdminIdentity, ProvisionError> {
    let username = username.trim();
    if username.is_empty()
        || username.chars().count() > MAX_USERNAME_LEN
        || username.chars().any(char::is_whitespace)
    {
        return Err(ProvisionError::InvalidUsername);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ProvisionError::WeakPassword);
    }

    if admins.find_by_username(username).await?.is_some() {
        return Err(ProvisionError::AlreadyExists(username.to_string()));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ProvisionError::Hash(e.to_string()))?
        .map_err(|e| ProvisionError::Hash(e.to_string()))?;

    let admin = AdminIdentity::new(username, password_hash);
    admins.create(&admin).await.map_err(|e| match e {
        StoreError::Duplicate(_) => ProvisionError::AlreadyExists(admin.username.clone()),
        other => ProvisionError::Store(other),
    })?;

    tracing::info!(username = %admin.username, admin_id = %admin.id, "Provisioned admin");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CorruptStorePolicy, FileAdminStore};
    use axum::http::HeaderValue;
    use tempfile::TempDir;

    fn admin_store(dir: &TempDir) -> AdminStore {
        AdminStore::file(FileAdminStore::new(
            dir.path().join("admins.json"),
            CorruptStorePolicy::TreatAsEmpty,
        ))
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_session_token_from_bearer() {
        let map = headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(session_token(&map), Some("abc123"));
    }

    #[test]
    fn test_session_token_from_cookie() {
        let map = headers(&[("cookie", "theme=dark; certis_session=tok-1; lang=id")]);
        assert_eq!(session_token(&map), Some("tok-1"));
    }

    #[test]
    fn test_session_token_bearer_wins_over_cookie() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "certis_session=from-cookie"),
        ]);
        assert_eq!(session_token(&map), Some("from-header"));
    }

    #[test]
    fn test_session_token_missing() {
        assert_eq!(session_token(&HeaderMap::new()), None);
        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(session_token(&map), None);
        let map = headers(&[("cookie", "certis_session=")]);
        assert_eq!(session_token(&map), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", 28800, true);
        assert!(cookie.starts_with("certis_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=28800"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = clear_session_cookie(false);
        assert!(cleared.contains("Max-Age=0"));
        assert!(!cleared.contains("Secure"));
    }

    #[tokio::test]
    async fn test_provision_then_authenticate() {
        let dir = TempDir::new().unwrap();
        let admins = admin_store(&dir);

        let admin = provision_admin(&admins, "registrar", Zeroizing::new("long-enough".into()))
            .await
            .unwrap();
        assert!(admin.password_hash.starts_with("$argon2id$"));

        let authed = authenticate(&admins, "registrar", Zeroizing::new("long-enough".into()))
            .await
            .unwrap();
        assert_eq!(authed.id, admin.id);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let dir = TempDir::new().unwrap();
        let admins = admin_store(&dir);
        provision_admin(&admins, "registrar", Zeroizing::new("long-enough".into()))
            .await
            .unwrap();

        let wrong = authenticate(&admins, "registrar", Zeroizing::new("nope".into()))
            .await
            .unwrap_err();
        let unknown = authenticate(&admins, "ghost", Zeroizing::new("long-enough".into()))
            .await
            .unwrap_err();

        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.error_code(), unknown.error_code());
        assert_eq!(wrong.status_code(), unknown.status_code());
    }

    #[tokio::test]
    async fn test_provision_rejects_duplicates_and_weak_input() {
        let dir = TempDir::new().unwrap();
        let admins = admin_store(&dir);
        provision_admin(&admins, "registrar", Zeroizing::new("long-enough".into()))
            .await
            .unwrap();

        assert!(matches!(
            provision_admin(&admins, "registrar", Zeroizing::new("another-one".into())).await,
            Err(ProvisionError::AlreadyExists(_))
        ));
        assert!(matches!(
            provision_admin(&admins, "clerk", Zeroizing::new("short".into())).await,
            Err(ProvisionError::WeakPassword)
        ));
        assert!(matches!(
            provision_admin(&admins, "two words", Zeroizing::new("long-enough".into())).await,
            Err(ProvisionError::InvalidUsername)
        ));
    }
}
