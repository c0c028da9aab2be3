//! Certis Server Library - REST API for issuing and verifying academic certificates
//!
//! This library exposes the server components for use in integration tests
//! and the `certis` CLI. The main binary uses these same components.

pub mod artifacts;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod issuance;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;

pub use artifacts::{ArtifactError, ArtifactStore};
pub use auth::{provision_admin, AdminSession, ProvisionError, SessionStore, SESSION_COOKIE};
pub use config::Config;
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
pub use store::{
    open_stores, AdminIdentity, AdminStore, CertificateStore, CorruptStorePolicy, ListQuery,
    StoreError,
};
