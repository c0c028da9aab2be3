//! JSON file backend.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use certis_core::CertificateRecord;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AdminIdentity, CertificatePage, CorruptStorePolicy, ListQuery, StoreError};

/// A JSON array of `T` persisted in a single file.
///
/// Readers never take the lock: writes land via rename, so a reader sees
/// either the old or the new document.
struct JsonFile<T> {
    path: PathBuf,
    policy: CorruptStorePolicy,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

enum Loaded<T> {
    Missing,
    Parsed(Vec<T>),
    Corrupt(String),
}

impl<T: Serialize + DeserializeOwned> JsonFile<T> {
    fn new(path: PathBuf, policy: CorruptStorePolicy) -> Self {
        Self {
            path,
            policy,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    async fn load_raw(&self) -> Result<Loaded<T>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Loaded::Missing);
        }

        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(Loaded::Parsed(items)),
            Err(e) => Ok(Loaded::Corrupt(e.to_string())),
        }
    }

    /// Read every entry, applying the corrupt-file policy.
    async fn read(&self) -> Result<Vec<T>, StoreError> {
        match self.load_raw().await? {
            Loaded::Missing => Ok(Vec::new()),
            Loaded::Parsed(items) => Ok(items),
            Loaded::Corrupt(reason) => self.on_corrupt(reason),
        }
    }

    fn on_corrupt(&self, reason: String) -> Result<Vec<T>, StoreError> {
        match self.policy {
            CorruptStorePolicy::TreatAsEmpty => {
                tracing::warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    "Store file is unreadable, treating as empty"
                );
                Ok(Vec::new())
            }
            CorruptStorePolicy::Fail => Err(StoreError::Corrupt {
                path: self.path.clone(),
                reason,
            }),
        }
    }

    /// Read-modify-write under the writer lock.
    ///
    /// `apply` returns `None` when it changed nothing; the file is then left
    /// as is.
    async fn update<R>(
        &self,
        apply: impl FnOnce(&mut Vec<T>) -> Result<Option<R>, StoreError>,
    ) -> Result<Option<R>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let (mut items, corrupt) = match self.load_raw().await? {
            Loaded::Missing => (Vec::new(), false),
            Loaded::Parsed(items) => (items, false),
            Loaded::Corrupt(reason) => (self.on_corrupt(reason)?, true),
        };

        let Some(result) = apply(&mut items)? else {
            return Ok(None);
        };

        if corrupt {
            self.quarantine().await?;
        }
        self.write(&items).await?;

        Ok(Some(result))
    }

    /// Move an unreadable file aside so it is never overwritten.
    async fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S%3f")));
        let target = PathBuf::from(name);

        tokio::fs::rename(&self.path, &target)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        tracing::warn!(
            path = %self.path.display(),
            quarantined = %target.display(),
            "Moved unreadable store file aside before rewriting"
        );

        Ok(target)
    }

    async fn write(&self, items: &[T]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(items)?;
        let tmp = tmp_path(&self.path);

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(&self.path, e));
        }

        Ok(())
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        match self.load_raw().await? {
            Loaded::Corrupt(reason) if self.policy == CorruptStorePolicy::Fail => {
                Err(StoreError::Corrupt {
                    path: self.path.clone(),
                    reason,
                })
            }
            _ => Ok(()),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Certificate records in `certificates.json`, oldest first on disk.
pub struct FileCertificateStore {
    file: JsonFile<CertificateRecord>,
}

impl FileCertificateStore {
    pub fn new(path: impl Into<PathBuf>, policy: CorruptStorePolicy) -> Self {
        Self {
            file: JsonFile::new(path.into(), policy),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub async fn insert(&self, record: &CertificateRecord) -> Result<(), StoreError> {
        self.file
            .update(|records| {
                if records.iter().any(|r| r.certificate_id == record.certificate_id) {
                    return Err(StoreError::Duplicate(format!(
                        "certificate_id {}",
                        record.certificate_id
                    )));
                }
                if records
                    .iter()
                    .any(|r| r.certificate_hash == record.certificate_hash)
                {
                    return Err(StoreError::Duplicate("certificate_hash".into()));
                }
                records.push(record.clone());
                Ok(Some(()))
            })
            .await?;

        tracing::debug!(certificate_id = %record.certificate_id, "Stored certificate record");
        Ok(())
    }

    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<CertificateRecord>, StoreError> {
        let records = self.file.read().await?;
        Ok(records.into_iter().find(|r| r.certificate_hash == hash))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<CertificateRecord>, StoreError> {
        let records = self.file.read().await?;
        Ok(records
            .into_iter()
            .find(|r| r.certificate_id.as_str() == id))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<CertificatePage, StoreError> {
        let records = self.file.read().await?;

        let matching: Vec<CertificateRecord> = records
            .into_iter()
            .rev()
            .filter(|r| match &query.student_id {
                Some(needle) => r.student_id_contains(needle),
                None => true,
            })
            .collect();

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page: Vec<CertificateRecord> = matching
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();

        Ok(CertificatePage::new(page, query, total))
    }

    pub async fn delete(&self, id: &str) -> Result<Option<CertificateRecord>, StoreError> {
        self.file
            .update(|records| {
                Ok(records
                    .iter()
                    .position(|r| r.certificate_id.as_str() == id)
                    .map(|index| records.remove(index)))
            })
            .await
    }

    pub async fn check_health(&self) -> Result<(), StoreError> {
        self.file.check_health().await
    }
}

/// Admin identities in `admins.json`.
pub struct FileAdminStore {
    file: JsonFile<AdminIdentity>,
}

impl FileAdminStore {
    pub fn new(path: impl Into<PathBuf>, policy: CorruptStorePolicy) -> Self {
        Self {
            file: JsonFile::new(path.into(), policy),
        }
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminIdentity>, StoreError> {
        let admins = self.file.read().await?;
        Ok(admins.into_iter().find(|a| a.username == username))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminIdentity>, StoreError> {
        let admins = self.file.read().await?;
        Ok(admins.into_iter().find(|a| a.id == id))
    }

    pub async fn create(&self, admin: &AdminIdentity) -> Result<(), StoreError> {
        self.file
            .update(|admins| {
                if admins.iter().any(|a| a.username == admin.username) {
                    return Err(StoreError::Duplicate(format!("username {}", admin.username)));
                }
                admins.push(admin.clone());
                Ok(Some(()))
            })
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.file.read().await?.len() as u64)
    }
}
