//! Certificate issuance, listing, retrieval and deletion handlers
//!
//! Issuance, listing, detail and deletion require an admin session. The
//! document and QR image endpoints are public so that holders and scanners
//! can fetch them by id.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use certis_core::{CertificateInput, CertificateRecord};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AdminSession;
use crate::config::Config;
use crate::error::ApiError;
use crate::issuance::{delete_certificate, issue_certificate, parse_certificate_id};
use crate::state::AppState;
use crate::store::{CertificatePage, ListQuery};

/// Issuance request: the four business fields
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueCertificateRequest {
    #[schema(example = "Jane Doe")]
    #[serde(default)]
    pub name: String,
    #[schema(example = "12345")]
    #[serde(default)]
    pub student_id: String,
    #[schema(example = "Computer Science")]
    #[serde(default)]
    pub program: String,
    #[schema(example = "State University")]
    #[serde(default)]
    pub institution: String,
}

impl From<IssueCertificateRequest> for CertificateInput {
    fn from(request: IssueCertificateRequest) -> Self {
        CertificateInput::new(
            request.name,
            request.student_id,
            request.program,
            request.institution,
        )
    }
}

/// Issuance result
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueCertificateResponse {
    #[schema(example = "CERT-3f1c9a6e-8d2b-4b7a-9a51-0c4d2e7f8b10")]
    pub certificate_id: String,
    /// SHA-256 fingerprint (lowercase hex), also encoded in the QR code
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub certificate_hash: String,
    #[schema(example = "2026-01-08")]
    pub issue_date: String,
    #[schema(example = "/certificates/CERT-3f1c9a6e-8d2b-4b7a-9a51-0c4d2e7f8b10/document")]
    pub document_url: String,
    #[schema(example = "/certificates/CERT-3f1c9a6e-8d2b-4b7a-9a51-0c4d2e7f8b10/qr")]
    pub qr_code_url: String,
}

/// Full certificate record with artifact links
#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateResponse {
    pub certificate_id: String,
    pub name: String,
    pub student_id: String,
    pub program: String,
    pub institution: String,
    pub issue_date: String,
    pub certificate_hash: String,
    pub document_url: String,
    pub qr_code_url: String,
}

impl CertificateResponse {
    fn new(record: CertificateRecord, config: &Config) -> Self {
        let (document_url, qr_code_url) = artifact_urls(config, record.certificate_id.as_str());
        Self {
            certificate_id: record.certificate_id.into(),
            name: record.name,
            student_id: record.student_id,
            program: record.program,
            institution: record.institution,
            issue_date: record.issue_date,
            certificate_hash: record.certificate_hash,
            document_url,
            qr_code_url,
        }
    }
}

/// Query parameters for listing certificates
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCertificatesQuery {
    /// Case-insensitive substring of the student id
    pub student_id: Option<String>,

    /// Page number (1-indexed)
    #[param(default = 1, minimum = 1)]
    pub page: Option<u32>,
}

/// One page of certificates, newest first
#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateListResponse {
    pub certificates: Vec<CertificateResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub page_size: u32,
    #[schema(example = 42)]
    pub total: u64,
    /// Never less than 1
    #[schema(example = 5)]
    pub total_pages: u32,
}

impl CertificateListResponse {
    fn new(page: CertificatePage, config: &Config) -> Self {
        Self {
            certificates: page
                .records
                .into_iter()
                .map(|record| CertificateResponse::new(record, config))
                .collect(),
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

/// Deletion result
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteCertificateResponse {
    #[schema(example = true)]
    pub deleted: bool,
    pub certificate_id: String,
}

/// Document and QR links for a certificate id.
pub fn artifact_urls(config: &Config, id: &str) -> (String, String) {
    let base = config.public_base_url.as_deref().unwrap_or("");
    (
        format!("{}/certificates/{}/document", base, id),
        format!("{}/certificates/{}/qr", base, id),
    )
}

/// Issue a certificate
///
/// Validates the four business fields, computes the fingerprint, renders the
/// PDF document and QR code, and persists the record. Nothing is stored if
/// any step fails.
#[utoipa::path(
    post,
    path = "/certificates",
    tag = "Certificates",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate issued", body = IssueCertificateResponse),
        (status = 400, description = "Missing or invalid field"),
        (status = 401, description = "Missing, invalid or expired session"),
        (status = 500, description = "Rendering or storage failure")
    ),
    security(
        ("session_cookie" = []),
        ("bearer_token" = [])
    )
)]
pub async fn issue_certificate_handler(
    State(state): State<AppState>,
    session: AdminSession,
    payload: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueCertificateResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let record = issue_certificate(&state.certificates, &state.artifacts, request.into()).await?;

    tracing::info!(
        certificate_id = %record.certificate_id,
        issued_by = %session.username,
        "Certificate issued via API"
    );

    let (document_url, qr_code_url) = artifact_urls(&state.config, record.certificate_id.as_str());

    Ok((
        StatusCode::CREATED,
        Json(IssueCertificateResponse {
            certificate_id: record.certificate_id.into(),
            certificate_hash: record.certificate_hash,
            issue_date: record.issue_date,
            document_url,
            qr_code_url,
        }),
    ))
}

/// List certificates
///
/// Optional case-insensitive `student_id` substring filter; fixed page size.
/// A page past the end returns an empty list with correct totals.
#[utoipa::path(
    get,
    path = "/certificates",
    tag = "Certificates",
    params(ListCertificatesQuery),
    responses(
        (status = 200, description = "Page of certificates", body = CertificateListResponse),
        (status = 400, description = "Invalid page number"),
        (status = 401, description = "Missing, invalid or expired session")
    ),
    security(
        ("session_cookie" = []),
        ("bearer_token" = [])
    )
)]
pub async fn list_certificates_handler(
    State(state): State<AppState>,
    _session: AdminSession,
    query: Result<Query<ListCertificatesQuery>, QueryRejection>,
) -> Result<Json<CertificateListResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::bad_request("page must be 1 or greater"));
    }

    let list_query = ListQuery::new(query.student_id, page, state.config.page_size);
    let page = state.certificates.list(&list_query).await?;

    Ok(Json(CertificateListResponse::new(page, &state.config)))
}

/// Get a certificate record
#[utoipa::path(
    get,
    path = "/certificates/{certificate_id}",
    tag = "Certificates",
    params(
        ("certificate_id" = String, Path, description = "Certificate id (CERT-...)")
    ),
    responses(
        (status = 200, description = "Certificate record", body = CertificateResponse),
        (status = 401, description = "Missing, invalid or expired session"),
        (status = 404, description = "Certificate not found")
    ),
    security(
        ("session_cookie" = []),
        ("bearer_token" = [])
    )
)]
pub async fn get_certificate_handler(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateResponse>, ApiError> {
    let id = parse_certificate_id(&certificate_id)?;

    let record = state
        .certificates
        .find_by_id(id.as_str())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Certificate {} not found", id)))?;

    Ok(Json(CertificateResponse::new(record, &state.config)))
}

/// Delete a certificate
///
/// Removes the record and both artifact files. The fingerprint stops
/// verifying immediately.
#[utoipa::path(
    delete,
    path = "/certificates/{certificate_id}",
    tag = "Certificates",
    params(
        ("certificate_id" = String, Path, description = "Certificate id (CERT-...)")
    ),
    responses(
        (status = 200, description = "Certificate deleted", body = DeleteCertificateResponse),
        (status = 401, description = "Missing, invalid or expired session"),
        (status = 404, description = "Certificate not found")
    ),
    security(
        ("session_cookie" = []),
        ("bearer_token" = [])
    )
)]
pub async fn delete_certificate_handler(
    State(state): State<AppState>,
    session: AdminSession,
    Path(certificate_id): Path<String>,
) -> Result<Json<DeleteCertificateResponse>, ApiError> {
    let id = parse_certificate_id(&certificate_id)?;

    let removed = delete_certificate(&state.certificates, &state.artifacts, id.as_str()).await?;

    tracing::info!(
        certificate_id = %removed.certificate_id,
        deleted_by = %session.username,
        "Certificate deleted via API"
    );

    Ok(Json(DeleteCertificateResponse {
        deleted: true,
        certificate_id: removed.certificate_id.into(),
    }))
}

/// Download the certificate document
#[utoipa::path(
    get,
    path = "/certificates/{certificate_id}/document",
    tag = "Certificates",
    params(
        ("certificate_id" = String, Path, description = "Certificate id (CERT-...)")
    ),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 404, description = "Certificate not found")
    )
)]
pub async fn certificate_document_handler(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_certificate_id(&certificate_id)?;

    let bytes = state
        .artifacts
        .read_document(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Certificate {} not found", id)))?;

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, format!("inline; filename=\"{}.pdf\"", id)),
            (CACHE_CONTROL, "no-cache".to_string()),
        ],
        Bytes::from(bytes),
    ))
}

/// Download the certificate QR code
///
/// The QR code encodes the certificate fingerprint.
#[utoipa::path(
    get,
    path = "/certificates/{certificate_id}/qr",
    tag = "Certificates",
    params(
        ("certificate_id" = String, Path, description = "Certificate id (CERT-...)")
    ),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png"),
        (status = 404, description = "Certificate not found")
    )
)]
pub async fn certificate_qr_handler(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_certificate_id(&certificate_id)?;

    let bytes = state
        .artifacts
        .read_qr(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Certificate {} not found", id)))?;

    Ok((
        [
            (CONTENT_TYPE, "image/png".to_string()),
            (CACHE_CONTROL, "no-cache".to_string()),
        ],
        Bytes::from(bytes),
    ))
}
