//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod auth;
pub mod certificates;
pub mod health;
pub mod verify;

pub use crate::state::AppState;
pub use auth::{
    login_handler, logout_handler, me_handler, AdminResponse, LoginRequest, LoginResponse,
    LogoutResponse,
};
pub use certificates::{
    certificate_document_handler, certificate_qr_handler, delete_certificate_handler,
    get_certificate_handler, issue_certificate_handler, list_certificates_handler,
    CertificateListResponse, CertificateResponse, DeleteCertificateResponse,
    IssueCertificateRequest, IssueCertificateResponse, ListCertificatesQuery,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use verify::{
    verify_by_hash_handler, verify_fingerprint, verify_handler, PublicCertificate,
    VerifyRequest, VerifyResponse,
};
