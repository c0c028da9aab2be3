//! Issuance and deletion workflows
//!
//! Issuance is all-or-nothing: input is validated before any side effect,
//! artifacts are rendered and staged, the record is committed, and only then
//! are the staged files moved into place. Any failure leaves neither record
//! nor files behind.
//!
//! Deletion parks the files, removes the record, then unlinks the files. A
//! failed record delete moves the files back, so a stored record always has
//! both of its artifacts.
//!
//! The sections that touch both stores run in spawned tasks so a dropped
//! request cannot stop them halfway.

use std::sync::Arc;

use certis_core::{render_certificate, CertificateId, CertificateInput, CertificateRecord};

use crate::artifacts::{ArtifactStore, StagedArtifacts};
use crate::error::ApiError;
use crate::store::CertificateStore;

/// Issue a certificate: validate, fingerprint, render, persist.
pub async fn issue_certificate(
    certificates: &Arc<CertificateStore>,
    artifacts: &ArtifactStore,
    input: CertificateInput,
) -> Result<CertificateRecord, ApiError> {
    let record = CertificateRecord::issue(input)?;

    let rendered = {
        let record = record.clone();
        tokio::task::spawn_blocking(move || render_certificate(&record))
            .await
            .map_err(|e| ApiError::internal(format!("Render task failed: {}", e)))??
    };

    let staged = artifacts.stage(&record.certificate_id, &rendered).await?;

    tokio::spawn(commit_issuance(Arc::clone(certificates), staged, record))
        .await
        .map_err(|e| ApiError::internal(format!("Issuance task failed: {}", e)))?
}

/// Insert the record, then move the staged files into place.
async fn commit_issuance(
    certificates: Arc<CertificateStore>,
    staged: StagedArtifacts,
    record: CertificateRecord,
) -> Result<CertificateRecord, ApiError> {
    // Dropping `staged` on error removes the partial files
    certificates.insert(&record).await?;

    if let Err(e) = staged.finalize().await {
        tracing::error!(
            certificate_id = %record.certificate_id,
            error = %e,
            "Failed to finalize artifacts, rolling back record"
        );
        if let Err(rollback) = certificates.delete(record.certificate_id.as_str()).await {
            tracing::error!(
                certificate_id = %record.certificate_id,
                error = %rollback,
                "Rollback of certificate record failed"
            );
        }
        return Err(e.into());
    }

    tracing::info!(
        certificate_id = %record.certificate_id,
        student_id = %record.student_id,
        "Issued certificate"
    );

    Ok(record)
}

/// Delete a certificate and both of its artifacts.
///
/// An unknown id is reported as not found and changes nothing.
pub async fn delete_certificate(
    certificates: &Arc<CertificateStore>,
    artifacts: &ArtifactStore,
    id: &str,
) -> Result<CertificateRecord, ApiError> {
    let record = certificates
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Certificate {} not found", id)))?;

    tokio::spawn(retire_and_delete(
        Arc::clone(certificates),
        artifacts.clone(),
        record,
    ))
    .await
    .map_err(|e| ApiError::internal(format!("Delete task failed: {}", e)))?
}

async fn retire_and_delete(
    certificates: Arc<CertificateStore>,
    artifacts: ArtifactStore,
    record: CertificateRecord,
) -> Result<CertificateRecord, ApiError> {
    let id = &record.certificate_id;
    let retired = artifacts.retire(id).await?;

    match certificates.delete(id.as_str()).await {
        Ok(Some(removed)) => {
            retired.purge().await;
            tracing::info!(certificate_id = %removed.certificate_id, "Deleted certificate");
            Ok(removed)
        }
        Ok(None) => {
            retired.purge().await;
            Err(ApiError::not_found(format!("Certificate {} not found", id)))
        }
        Err(e) => {
            if let Err(restore) = retired.restore().await {
                tracing::error!(
                    certificate_id = %id,
                    error = %restore,
                    "Failed to restore artifacts after failed delete"
                );
            }
            Err(e.into())
        }
    }
}

/// Parse a path-supplied id; malformed ids cannot exist, so they are not found.
pub fn parse_certificate_id(id: &str) -> Result<CertificateId, ApiError> {
    CertificateId::parse(id)
        .map_err(|_| ApiError::not_found(format!("Certificate {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CorruptStorePolicy, FileCertificateStore, ListQuery};
    use certis_core::RenderedCertificate;
    use tempfile::TempDir;

    fn stores(dir: &TempDir) -> (Arc<CertificateStore>, ArtifactStore) {
        (
            Arc::new(CertificateStore::file(FileCertificateStore::new(
                dir.path().join("data/certificates.json"),
                CorruptStorePolicy::TreatAsEmpty,
            ))),
            ArtifactStore::new(dir.path().join("certificates")),
        )
    }

    fn jane() -> CertificateInput {
        CertificateInput::new("Jane Doe", "12345", "Computer Science", "State University")
    }

    fn artifact_count(artifacts: &ArtifactStore) -> usize {
        std::fs::read_dir(artifacts.dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    fn artifact_names(artifacts: &ArtifactStore) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(artifacts.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_issue_writes_record_and_artifacts() {
        let dir = TempDir::new().unwrap();
        let (certificates, artifacts) = stores(&dir);

        let record = issue_certificate(&certificates, &artifacts, jane())
            .await
            .unwrap();

        assert!(record.fingerprint_matches());
        assert!(artifacts.document_path(&record.certificate_id).exists());
        assert!(artifacts.qr_path(&record.certificate_id).exists());
        assert_eq!(artifact_count(&artifacts), 2);
        assert_eq!(
            certificates
                .find_by_hash(&record.certificate_hash)
                .await
                .unwrap(),
            Some(record)
        );
    }

    #[tokio::test]
    async fn test_invalid_input_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let (certificates, artifacts) = stores(&dir);

        let input = CertificateInput::new("Jane Doe", "  ", "Computer Science", "State University");
        let err = issue_certificate(&certificates, &artifacts, input)
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(!artifacts.dir().exists());
        let page = certificates.list(&ListQuery::new(None, 1, 10)).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_unwritable_artifact_dir_leaves_no_record() {
        let dir = TempDir::new().unwrap();
        let (certificates, _) = stores(&dir);
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let artifacts = ArtifactStore::new(&blocker);

        let err = issue_certificate(&certificates, &artifacts, jane())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        let page = certificates.list(&ListQuery::new(None, 1, 10)).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_failed_record_write_removes_staged_files() {
        let dir = TempDir::new().unwrap();
        // Store path whose parent is a regular file: every write fails
        std::fs::write(dir.path().join("data"), b"file, not a directory").unwrap();
        let (certificates, artifacts) = stores(&dir);

        let err = issue_certificate(&certificates, &artifacts, jane())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(artifact_count(&artifacts), 0);
    }

    #[tokio::test]
    async fn test_failed_finalize_rolls_back_record() {
        let dir = TempDir::new().unwrap();
        let (certificates, artifacts) = stores(&dir);
        let record = CertificateRecord::issue(jane()).unwrap();
        let rendered = RenderedCertificate {
            document: b"%PDF-1.3 test".to_vec(),
            qr_png: b"\x89PNG test".to_vec(),
        };
        let staged = artifacts.stage(&record.certificate_id, &rendered).await.unwrap();
        // A directory at the QR name makes the second rename fail
        let qr_path = artifacts.qr_path(&record.certificate_id);
        std::fs::create_dir(&qr_path).unwrap();

        let err = commit_issuance(Arc::clone(&certificates), staged, record.clone())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(certificates
            .find_by_id(record.certificate_id.as_str())
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            artifact_names(&artifacts),
            vec![format!("{}.png", record.certificate_id)]
        );
        assert!(qr_path.is_dir());
    }

    #[tokio::test]
    async fn test_failed_record_delete_keeps_files() {
        let dir = TempDir::new().unwrap();
        let (certificates, artifacts) = stores(&dir);
        let record = issue_certificate(&certificates, &artifacts, jane())
            .await
            .unwrap();
        // A directory at the temp name makes the store rewrite fail
        let blocker = dir.path().join("data/certificates.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let err = delete_certificate(&certificates, &artifacts, record.certificate_id.as_str())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(
            certificates
                .find_by_hash(&record.certificate_hash)
                .await
                .unwrap(),
            Some(record.clone())
        );
        assert_eq!(
            artifact_names(&artifacts),
            vec![
                format!("{}.pdf", record.certificate_id),
                format!("{}.png", record.certificate_id),
            ]
        );

        std::fs::remove_dir(&blocker).unwrap();
        delete_certificate(&certificates, &artifacts, record.certificate_id.as_str())
            .await
            .unwrap();
        assert_eq!(artifact_count(&artifacts), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_files() {
        let dir = TempDir::new().unwrap();
        let (certificates, artifacts) = stores(&dir);
        let record = issue_certificate(&certificates, &artifacts, jane())
            .await
            .unwrap();

        let removed = delete_certificate(&certificates, &artifacts, record.certificate_id.as_str())
            .await
            .unwrap();

        assert_eq!(removed, record);
        assert_eq!(artifact_count(&artifacts), 0);
        assert!(certificates
            .find_by_hash(&record.certificate_hash)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (certificates, artifacts) = stores(&dir);
        let record = issue_certificate(&certificates, &artifacts, jane())
            .await
            .unwrap();

        let err = delete_certificate(&certificates, &artifacts, "CERT-does-not-exist")
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(artifact_count(&artifacts), 2);
        assert!(certificates
            .find_by_id(record.certificate_id.as_str())
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_parse_certificate_id_rejects_traversal() {
        assert!(parse_certificate_id("CERT-../../etc/passwd").is_err());
        assert!(parse_certificate_id("CERT-20240101120000").is_ok());
    }
}
