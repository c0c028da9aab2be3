//! Certificate verification handlers
//!
//! Handles POST /verify and GET /verify/{hash}. An unknown fingerprint is a
//! normal negative result (200 with `valid: false`), not an error.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use certis_core::{normalize_fingerprint, CertificateRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::CertificateStore;

const VERIFIED_MESSAGE: &str = "Certificate verified";
const NOT_FOUND_MESSAGE: &str = "Certificate not found";

/// Verification request
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Fingerprint as printed on the document or read from the QR code
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    #[serde(default)]
    pub certificate_hash: String,
}

/// Certificate fields disclosed to any verifier
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicCertificate {
    #[schema(example = "CERT-3f1c9a6e-8d2b-4b7a-9a51-0c4d2e7f8b10")]
    pub certificate_id: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "12345")]
    pub student_id: String,
    #[schema(example = "Computer Science")]
    pub program: String,
    #[schema(example = "State University")]
    pub institution: String,
    #[schema(example = "2026-01-08")]
    pub issue_date: String,
}

impl From<CertificateRecord> for PublicCertificate {
    fn from(record: CertificateRecord) -> Self {
        Self {
            certificate_id: record.certificate_id.into(),
            name: record.name,
            student_id: record.student_id,
            program: record.program,
            institution: record.institution,
            issue_date: record.issue_date,
        }
    }
}

/// Response for verification
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// Whether the fingerprint belongs to an issued, non-deleted certificate
    #[schema(example = true)]
    pub valid: bool,
    #[schema(example = "Certificate verified")]
    pub message: String,
    /// Present only when `valid` is true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PublicCertificate>,
}

impl VerifyResponse {
    fn not_found() -> Self {
        Self {
            valid: false,
            message: NOT_FOUND_MESSAGE.to_string(),
            certificate: None,
        }
    }
}

/// Look up a submitted fingerprint. Malformed input can never match.
pub async fn verify_fingerprint(
    certificates: &CertificateStore,
    submitted: &str,
) -> Result<VerifyResponse, ApiError> {
    let Some(hash) = normalize_fingerprint(submitted) else {
        tracing::debug!("Verification with malformed fingerprint");
        return Ok(VerifyResponse::not_found());
    };

    match certificates.find_by_hash(&hash).await? {
        Some(record) => {
            tracing::info!(certificate_id = %record.certificate_id, "Certificate verified");
            Ok(VerifyResponse {
                valid: true,
                message: VERIFIED_MESSAGE.to_string(),
                certificate: Some(record.into()),
            })
        }
        None => {
            tracing::info!(certificate_hash = %hash, "Verification found no certificate");
            Ok(VerifyResponse::not_found())
        }
    }
}

/// Verify a certificate fingerprint
///
/// Returns `valid: true` with the public certificate fields when the
/// fingerprint matches an issued certificate. Surrounding whitespace and
/// letter case are ignored.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Verification",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification completed", body = VerifyResponse),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    verify_fingerprint(&state.certificates, &request.certificate_hash)
        .await
        .map(Json)
}

/// Verify a fingerprint given in the path
///
/// Same as `POST /verify`, for links and QR scanners.
#[utoipa::path(
    get,
    path = "/verify/{certificate_hash}",
    tag = "Verification",
    params(
        ("certificate_hash" = String, Path, description = "SHA-256 fingerprint (hex)")
    ),
    responses(
        (status = 200, description = "Verification completed", body = VerifyResponse),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn verify_by_hash_handler(
    State(state): State<AppState>,
    Path(certificate_hash): Path<String>,
) -> Result<Json<VerifyResponse>, ApiError> {
    verify_fingerprint(&state.certificates, &certificate_hash)
        .await
        .map(Json)
}
