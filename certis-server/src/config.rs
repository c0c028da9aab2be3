//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::store::CorruptStorePolicy;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 1)
    pub body_limit_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Directory holding the file-backed metadata and admin stores (default: ./data)
    pub data_dir: PathBuf,
    /// Directory holding generated documents and QR images (default: ./certificates)
    pub artifact_dir: PathBuf,
    /// PostgreSQL connection URL; when set, replaces the file-backed stores
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Certificates per listing page (default: 10)
    pub page_size: u32,
    /// Session lifetime in seconds (default: 8 hours)
    pub session_ttl_secs: u64,
    /// Add the `Secure` attribute to the session cookie (default: false)
    pub cookie_secure: bool,
    /// What to do when the metadata file exists but cannot be parsed
    pub corrupt_store_policy: CorruptStorePolicy,
    /// Absolute base URL used to build artifact links (default: relative links)
    pub public_base_url: Option<String>,
    /// Admin provisioned at startup when absent
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the startup admin provisioning step.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 1,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            data_dir: PathBuf::from("data"),
            artifact_dir: PathBuf::from("certificates"),
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            page_size: 10,
            session_ttl_secs: 8 * 60 * 60,
            cookie_secure: false,
            corrupt_store_policy: CorruptStorePolicy::TreatAsEmpty,
            public_base_url: None,
            bootstrap_admin: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let corrupt_store_policy = match env_non_empty("STORE_CORRUPT_POLICY") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring STORE_CORRUPT_POLICY");
                defaults.corrupt_store_policy
            }),
            None => defaults.corrupt_store_policy,
        };

        let bootstrap_admin = match (
            env_non_empty("ADMIN_BOOTSTRAP_USERNAME"),
            std::env::var("ADMIN_BOOTSTRAP_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) if !password.is_empty() => {
                Some(BootstrapAdmin { username, password })
            }
            _ => None,
        };

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            data_dir: env_non_empty("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            artifact_dir: env_non_empty("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            database_url: env_non_empty("DATABASE_URL"),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            database_min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                .unwrap_or(defaults.database_min_connections),
            page_size: env_parse::<u32>("PAGE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
            session_ttl_secs: env_parse::<u64>("SESSION_TTL_SECS")
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.session_ttl_secs),
            cookie_secure,
            corrupt_store_policy,
            public_base_url: env_non_empty("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            bootstrap_admin,
        }
    }

    /// Config rooted in a single directory (data + artifacts), used by tests and the CLI.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("data"),
            artifact_dir: root.join("certificates"),
            ..Self::default()
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Path of the certificate metadata file (file backend)
    pub fn certificate_store_path(&self) -> PathBuf {
        self.data_dir.join("certificates.json")
    }

    /// Path of the admin identity file (file backend)
    pub fn admin_store_path(&self) -> PathBuf {
        self.data_dir.join("admins.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.page_size, 10);
        assert!(!config.rate_limit_enabled);
        assert!(config.database_url.is_none());
        assert_eq!(config.corrupt_store_policy, CorruptStorePolicy::TreatAsEmpty);
    }

    #[test]
    fn test_rooted_at_paths() {
        let config = Config::rooted_at("/srv/certis");
        assert_eq!(
            config.certificate_store_path(),
            PathBuf::from("/srv/certis/data/certificates.json")
        );
        assert_eq!(
            config.admin_store_path(),
            PathBuf::from("/srv/certis/data/admins.json")
        );
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/certis/certificates"));
    }

    #[test]
    fn test_bootstrap_admin_debug_redacts_password() {
        let admin = BootstrapAdmin {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", admin);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
