//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 specification for the Certis API.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    AdminResponse, CertificateListResponse, CertificateResponse, DeleteCertificateResponse,
    HealthResponse, IssueCertificateRequest, IssueCertificateResponse, LoginRequest,
    LoginResponse, LogoutResponse, PublicCertificate, ReadyResponse, VerifyRequest,
    VerifyResponse,
};

/// Registers the session cookie and bearer token schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                crate::auth::SESSION_COOKIE,
            ))),
        );
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Certis API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Certis - Academic Certificate API",
        version = "0.1.0",
        description = r#"
## Digital Academic Certificate Issuance and Verification

Certis issues tamper-evident academic certificates:

- Each certificate gets a random `CERT-<uuid>` identifier
- A **SHA-256 fingerprint** binds the identifier to the holder's name,
  student id, program and institution
- A printable **PDF** carries the fields and a **QR code** encoding the fingerprint

### How It Works

1. An operator logs in via `POST /auth/login`
2. The operator issues a certificate via `POST /certificates`
3. Anyone verifies a fingerprint via `POST /verify` or `GET /verify/{hash}`
4. Deleting a certificate revokes it: its fingerprint stops verifying

### Fingerprint layout

`sha256(certificate_id ‖ name ‖ student_id ‖ program ‖ institution)`, UTF-8,
no separators, lowercase hex.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Authentication", description = "Operator sessions"),
        (name = "Certificates", description = "Issue, list, retrieve and delete certificates"),
        (name = "Verification", description = "Check a fingerprint against issued certificates"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::logout_handler,
        crate::handlers::auth::me_handler,
        crate::handlers::certificates::issue_certificate_handler,
        crate::handlers::certificates::list_certificates_handler,
        crate::handlers::certificates::get_certificate_handler,
        crate::handlers::certificates::delete_certificate_handler,
        crate::handlers::certificates::certificate_document_handler,
        crate::handlers::certificates::certificate_qr_handler,
        crate::handlers::verify::verify_handler,
        crate::handlers::verify::verify_by_hash_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            LoginRequest,
            LoginResponse,
            LogoutResponse,
            AdminResponse,
            IssueCertificateRequest,
            IssueCertificateResponse,
            CertificateResponse,
            CertificateListResponse,
            DeleteCertificateResponse,
            VerifyRequest,
            VerifyResponse,
            PublicCertificate,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
