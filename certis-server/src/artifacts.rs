//! Certificate artifact files
//!
//! Every issued certificate owns two files in the artifact directory:
//! `<id>.pdf` (the document) and `<id>.png` (the QR code). Issuance writes
//! them under `.partial` names first and renames them only once the metadata
//! record is committed. Deletion parks them under `.deleting` names until
//! the record is gone, so a failed store write can put them back.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use certis_core::{CertificateId, RenderedCertificate};
use thiserror::Error;

const DOCUMENT_EXTENSION: &str = "pdf";
const QR_EXTENSION: &str = "png";
const STAGING_SUFFIX: &str = ".partial";
const RETIRING_SUFFIX: &str = ".deleting";

/// Errors from artifact file operations.
#[derive(Debug, Error)]
#[error("Failed to {op} {}: {source}", path.display())]
pub struct ArtifactError {
    op: &'static str,
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl ArtifactError {
    fn new(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Filesystem location of certificate documents and QR images.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn document_path(&self, id: &CertificateId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, DOCUMENT_EXTENSION))
    }

    pub fn qr_path(&self, id: &CertificateId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, QR_EXTENSION))
    }

    /// Write both artifacts under staging names.
    ///
    /// The returned guard removes the staged files when dropped unless
    /// [`StagedArtifacts::finalize`] succeeded.
    pub async fn stage(
        &self,
        id: &CertificateId,
        rendered: &RenderedCertificate,
    ) -> Result<StagedArtifacts, ArtifactError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ArtifactError::new("create directory", &self.dir, e))?;

        let mut staged = StagedArtifacts {
            files: Vec::with_capacity(2),
            committed: false,
        };

        for (target, bytes) in [
            (self.document_path(id), rendered.document.as_slice()),
            (self.qr_path(id), rendered.qr_png.as_slice()),
        ] {
            let partial = suffixed(&target, STAGING_SUFFIX);
            // Registered before writing so a partial write is cleaned up too
            staged.files.push((partial.clone(), target));
            tokio::fs::write(&partial, bytes)
                .await
                .map_err(|e| ArtifactError::new("write", &partial, e))?;
        }

        Ok(staged)
    }

    pub async fn read_document(&self, id: &CertificateId) -> Result<Option<Vec<u8>>, ArtifactError> {
        read_optional(&self.document_path(id)).await
    }

    pub async fn read_qr(&self, id: &CertificateId) -> Result<Option<Vec<u8>>, ArtifactError> {
        read_optional(&self.qr_path(id)).await
    }

    /// Park both artifacts under `.deleting` names ahead of record deletion.
    ///
    /// Files that are already gone are skipped. If a rename fails, files
    /// parked so far are moved back before the error is returned.
    pub async fn retire(&self, id: &CertificateId) -> Result<RetiredArtifacts, ArtifactError> {
        let mut retired = RetiredArtifacts {
            files: Vec::with_capacity(2),
            settled: false,
        };

        for target in [self.document_path(id), self.qr_path(id)] {
            let parked = suffixed(&target, RETIRING_SUFFIX);
            match tokio::fs::rename(&target, &parked).await {
                Ok(()) => retired.files.push((parked, target)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(path = %target.display(), "Artifact already missing");
                }
                Err(e) => return Err(ArtifactError::new("retire", &target, e)),
            }
        }

        Ok(retired)
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ArtifactError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ArtifactError::new("read", path, e)),
    }
}

fn suffixed(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Staged artifacts awaiting commit.
#[must_use = "staged artifacts are deleted on drop unless finalized"]
pub struct StagedArtifacts {
    /// (staged path, final path)
    files: Vec<(PathBuf, PathBuf)>,
    committed: bool,
}

impl StagedArtifacts {
    /// Move the staged files to their final names.
    ///
    /// On failure, files already moved are removed again and the remaining
    /// staged files are cleaned up by the drop guard.
    pub async fn finalize(mut self) -> Result<(), ArtifactError> {
        let mut moved: Vec<PathBuf> = Vec::with_capacity(self.files.len());

        for (partial, target) in &self.files {
            if let Err(e) = tokio::fs::rename(partial, target).await {
                for path in &moved {
                    let _ = tokio::fs::remove_file(path).await;
                }
                return Err(ArtifactError::new("finalize", target, e));
            }
            moved.push(target.clone());
        }

        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedArtifacts {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (partial, _) in &self.files {
            match std::fs::remove_file(partial) {
                Ok(()) => {
                    tracing::debug!(path = %partial.display(), "Removed staged artifact");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %partial.display(), error = %e, "Failed to remove staged artifact");
                }
            }
        }
    }
}

/// Artifacts parked for deletion.
#[must_use = "retired artifacts are moved back on drop unless purged or restored"]
pub struct RetiredArtifacts {
    /// (parked path, original path)
    files: Vec<(PathBuf, PathBuf)>,
    settled: bool,
}

impl RetiredArtifacts {
    /// Unlink the parked files once the record is gone.
    pub async fn purge(mut self) {
        self.settled = true;
        for (parked, _) in &self.files {
            if let Err(e) = tokio::fs::remove_file(parked).await {
                tracing::warn!(path = %parked.display(), error = %e, "Failed to purge artifact");
            }
        }
    }

    /// Move the parked files back to their original names.
    pub async fn restore(mut self) -> Result<(), ArtifactError> {
        self.settled = true;
        let mut first_error = None;
        for (parked, original) in &self.files {
            if let Err(e) = tokio::fs::rename(parked, original).await {
                if first_error.is_none() {
                    first_error = Some(ArtifactError::new("restore", original, e));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for RetiredArtifacts {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        for (parked, original) in &self.files {
            if let Err(e) = std::fs::rename(parked, original) {
                tracing::error!(path = %original.display(), error = %e, "Failed to restore artifact");
            }
        }
    }
}
