//! In-memory operator sessions
//!
//! Sessions are short-lived and tied to the running process, so they live in
//! a concurrent map rather than the database. Only the SHA-256 of each token
//! is kept as the map key.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Random bytes per session token (256 bits)
const TOKEN_BYTES: usize = 32;

/// An authenticated operator session.
#[derive(Debug, Clone)]
pub struct Session {
    pub admin_id: Uuid,
    pub username: String,
    expires_at: Instant,
}

impl Session {
    pub fn expires_in(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Session token store keyed by token digest.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return its bearer token.
    pub fn create(&self, admin_id: Uuid, username: impl Into<String>) -> String {
        let token = generate_token();
        self.sessions.insert(
            token_key(&token),
            Session {
                admin_id,
                username: username.into(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Look up a live session. Expired entries are removed on access.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let key = token_key(token);
        let session = self.sessions.get(&key)?.value().clone();

        if session.is_live(Instant::now()) {
            Some(session)
        } else {
            self.sessions.remove(&key);
            None
        }
    }

    /// Invalidate a token. Returns whether a session existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(&token_key(token)).is_some()
    }

    /// Remove expired sessions (called periodically). Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|_, session| session.is_live(now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
