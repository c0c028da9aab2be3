//! Certificate metadata and admin identity storage
//!
//! Two backends share one interface:
//! - **File** (default): JSON documents under `DATA_DIR`, every mutation a
//!   read-modify-write behind a single async writer lock, written to a temp
//!   file and renamed into place.
//! - **PostgreSQL**: selected when `DATABASE_URL` is set; uniqueness and
//!   atomicity come from the table constraints.

mod error;
mod file;
mod postgres;

pub use error::StoreError;
pub use file::{FileAdminStore, FileCertificateStore};
pub use postgres::{PostgresAdminStore, PostgresCertificateStore};

use std::fmt;
use std::str::FromStr;

use certis_core::CertificateRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::Config;

/// What to do when a store file exists but cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptStorePolicy {
    /// Read as empty and log a warning; the unreadable file is moved aside
    /// to `<file>.corrupt-<timestamp>` before the next write.
    #[default]
    TreatAsEmpty,
    /// Surface the parse failure as a storage error.
    Fail,
}

impl FromStr for CorruptStorePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "treat-as-empty" | "tolerant" => Ok(Self::TreatAsEmpty),
            "fail" | "strict" => Ok(Self::Fail),
            other => Err(format!(
                "unknown corrupt store policy '{}' (expected 'treat-as-empty' or 'fail')",
                other
            )),
        }
    }
}

impl fmt::Display for CorruptStorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreatAsEmpty => f.write_str("treat-as-empty"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// Listing parameters: optional student-id substring and a 1-indexed page.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub student_id: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(student_id: Option<String>, page: u32, page_size: u32) -> Self {
        let student_id = student_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            student_id,
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of a listing, newest certificate first.
#[derive(Debug, Clone)]
pub struct CertificatePage {
    pub records: Vec<CertificateRecord>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl CertificatePage {
    fn new(records: Vec<CertificateRecord>, query: &ListQuery, total: u64) -> Self {
        Self {
            records,
            page: query.page,
            page_size: query.page_size,
            total,
            total_pages: total_pages(total, query.page_size),
        }
    }
}

/// Page count for `total` matching records; never less than one.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// A provisioned operator account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AdminIdentity {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

enum CertificateBackend {
    File(FileCertificateStore),
    Postgres(PostgresCertificateStore),
}

/// Certificate metadata store (file or PostgreSQL).
pub struct CertificateStore {
    backend: CertificateBackend,
}

impl CertificateStore {
    pub fn file(store: FileCertificateStore) -> Self {
        Self {
            backend: CertificateBackend::File(store),
        }
    }

    pub fn postgres(store: PostgresCertificateStore) -> Self {
        Self {
            backend: CertificateBackend::Postgres(store),
        }
    }

    /// Persist a freshly issued record. Fails with `Duplicate` if the id or
    /// fingerprint is already stored.
    pub async fn insert(&self, record: &CertificateRecord) -> Result<(), StoreError> {
        match &self.backend {
            CertificateBackend::File(store) => store.insert(record).await,
            CertificateBackend::Postgres(store) => store.insert(record).await,
        }
    }

    /// Exact lookup by normalized fingerprint.
    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<CertificateRecord>, StoreError> {
        match &self.backend {
            CertificateBackend::File(store) => store.find_by_hash(hash).await,
            CertificateBackend::Postgres(store) => store.find_by_hash(hash).await,
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<CertificateRecord>, StoreError> {
        match &self.backend {
            CertificateBackend::File(store) => store.find_by_id(id).await,
            CertificateBackend::Postgres(store) => store.find_by_id(id).await,
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<CertificatePage, StoreError> {
        match &self.backend {
            CertificateBackend::File(store) => store.list(query).await,
            CertificateBackend::Postgres(store) => store.list(query).await,
        }
    }

    /// Remove a record, returning it if it existed. A missing id leaves the
    /// store untouched.
    pub async fn delete(&self, id: &str) -> Result<Option<CertificateRecord>, StoreError> {
        match &self.backend {
            CertificateBackend::File(store) => store.delete(id).await,
            CertificateBackend::Postgres(store) => store.delete(id).await,
        }
    }

    pub async fn check_health(&self) -> Result<(), StoreError> {
        match &self.backend {
            CertificateBackend::File(store) => store.check_health().await,
            CertificateBackend::Postgres(store) => store.check_health().await,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            CertificateBackend::File(_) => "file",
            CertificateBackend::Postgres(_) => "postgres",
        }
    }
}

impl fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateStore")
            .field("backend", &self.backend_name())
            .finish()
    }
}

enum AdminBackend {
    File(FileAdminStore),
    Postgres(PostgresAdminStore),
}

/// Admin identity store (file or PostgreSQL).
pub struct AdminStore {
    backend: AdminBackend,
}

impl AdminStore {
    pub fn file(store: FileAdminStore) -> Self {
        Self {
            backend: AdminBackend::File(store),
        }
    }

    pub fn postgres(store: PostgresAdminStore) -> Self {
        Self {
            backend: AdminBackend::Postgres(store),
        }
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminIdentity>, StoreError> {
        match &self.backend {
            AdminBackend::File(store) => store.find_by_username(username).await,
            AdminBackend::Postgres(store) => store.find_by_username(username).await,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminIdentity>, StoreError> {
        match &self.backend {
            AdminBackend::File(store) => store.find_by_id(id).await,
            AdminBackend::Postgres(store) => store.find_by_id(id).await,
        }
    }

    /// Store a new identity. Fails with `Duplicate` if the username is taken.
    pub async fn create(&self, admin: &AdminIdentity) -> Result<(), StoreError> {
        match &self.backend {
            AdminBackend::File(store) => store.create(admin).await,
            AdminBackend::Postgres(store) => store.create(admin).await,
        }
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        match &self.backend {
            AdminBackend::File(store) => store.count().await,
            AdminBackend::Postgres(store) => store.count().await,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            AdminBackend::File(_) => "file",
            AdminBackend::Postgres(_) => "postgres",
        }
    }
}

impl fmt::Debug for AdminStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminStore")
            .field("backend", &self.backend_name())
            .finish()
    }
}

/// Open both stores according to the configuration.
///
/// Uses PostgreSQL (running migrations) if `database_url` is set, otherwise
/// the JSON files under `data_dir`.
pub async fn open_stores(config: &Config) -> Result<(CertificateStore, AdminStore), StoreError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .connect(url)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            tracing::info!(
                max_connections = config.database_max_connections,
                "Using PostgreSQL storage, migrations applied"
            );

            Ok((
                CertificateStore::postgres(PostgresCertificateStore::new(pool.clone())),
                AdminStore::postgres(PostgresAdminStore::new(pool)),
            ))
        }
        None => {
            tracing::info!(
                data_dir = %config.data_dir.display(),
                policy = %config.corrupt_store_policy,
                "Using file storage"
            );

            Ok((
                CertificateStore::file(FileCertificateStore::new(
                    config.certificate_store_path(),
                    config.corrupt_store_policy,
                )),
                AdminStore::file(FileAdminStore::new(
                    config.admin_store_path(),
                    config.corrupt_store_policy,
                )),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_minimum_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn test_list_query_normalizes_filter_and_page() {
        let query = ListQuery::new(Some("   ".into()), 0, 10);
        assert!(query.student_id.is_none());
        assert_eq!(query.page, 1);
        assert_eq!(query.offset(), 0);

        let query = ListQuery::new(Some(" 123 ".into()), 3, 10);
        assert_eq!(query.student_id.as_deref(), Some("123"));
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_corrupt_policy_parsing() {
        assert_eq!(
            "treat-as-empty".parse::<CorruptStorePolicy>().unwrap(),
            CorruptStorePolicy::TreatAsEmpty
        );
        assert_eq!(
            "FAIL".parse::<CorruptStorePolicy>().unwrap(),
            CorruptStorePolicy::Fail
        );
        assert!("ignore".parse::<CorruptStorePolicy>().is_err());
        assert_eq!(CorruptStorePolicy::Fail.to_string(), "fail");
    }
}
