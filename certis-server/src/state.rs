//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use zeroize::Zeroizing;

use crate::artifacts::ArtifactStore;
use crate::auth::{provision_admin, ProvisionError, SessionStore};
use crate::config::{BootstrapAdmin, Config};
use crate::store::{open_stores, AdminStore, CertificateStore, StoreError};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Certificate metadata store
    pub certificates: Arc<CertificateStore>,
    /// Admin identity store
    pub admins: Arc<AdminStore>,
    /// Document and QR files
    pub artifacts: Arc<ArtifactStore>,
    /// Live operator sessions
    pub sessions: Arc<SessionStore>,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Assemble state from already-opened stores.
    pub fn new(certificates: CertificateStore, admins: AdminStore, config: Config) -> Self {
        Self {
            certificates: Arc::new(certificates),
            admins: Arc::new(admins),
            artifacts: Arc::new(ArtifactStore::new(config.artifact_dir.clone())),
            sessions: Arc::new(SessionStore::new(Duration::from_secs(
                config.session_ttl_secs,
            ))),
            config: Arc::new(config),
        }
    }

    /// Open the configured stores and build the state.
    pub async fn from_config(config: Config) -> Result<Self, StoreError> {
        let (certificates, admins) = open_stores(&config).await?;
        Ok(Self::new(certificates, admins, config))
    }

    /// Provision the bootstrap admin if configured and not yet present.
    pub async fn ensure_bootstrap_admin(&self) -> Result<(), ProvisionError> {
        let Some(BootstrapAdmin { username, password }) = self.config.bootstrap_admin.clone()
        else {
            return Ok(());
        };

        if self.admins.find_by_username(username.trim()).await?.is_some() {
            tracing::info!(username = %username, "Bootstrap admin already present");
            return Ok(());
        }

        provision_admin(&self.admins, &username, Zeroizing::new(password)).await?;
        Ok(())
    }

    /// Spawn the periodic purge of expired sessions.
    pub fn spawn_session_cleanup(&self) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = sessions.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = sessions.len(), "Purged expired sessions");
                }
            }
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("certificates", &self.certificates)
            .field("admins", &self.admins)
            .field("artifacts", &self.artifacts)
            .field("sessions", &self.sessions)
            .finish()
    }
}
