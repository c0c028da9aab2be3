//! Certis Core - digital academic certificate records
//!
//! This crate provides the pieces shared by the Certis server and CLI:
//!
//! - The immutable [`CertificateRecord`] model
//! - The identity and fingerprint scheme (random `CERT-<uuid>` ids, SHA-256
//!   fingerprint over a fixed field concatenation)
//! - QR code and PDF rendering of a certificate (feature `render`)
//!
//! # Example
//!
//! ```
//! use certis_core::{compute_fingerprint, CertificateInput, CertificateRecord};
//!
//! let record = CertificateRecord::issue(CertificateInput::new(
//!     "Jane Doe",
//!     "12345",
//!     "Computer Science",
//!     "State University",
//! ))?;
//!
//! // Anyone holding the fields can recompute the fingerprint
//! let recomputed = compute_fingerprint(
//!     record.certificate_id.as_str(),
//!     "Jane Doe",
//!     "12345",
//!     "Computer Science",
//!     "State University",
//! );
//! assert_eq!(recomputed, record.certificate_hash);
//! # Ok::<(), certis_core::CertisError>(())
//! ```

pub mod certificate;
pub mod error;

#[cfg(feature = "render")]
pub mod document;
#[cfg(feature = "render")]
pub mod qr;

pub use certificate::{
    compute_fingerprint, normalize_fingerprint, CertificateId, CertificateInput,
    CertificateRecord, CERTIFICATE_ID_PREFIX, FINGERPRINT_HEX_LEN, ISSUE_DATE_FORMAT,
};
pub use error::{CertisError, Result};

#[cfg(feature = "render")]
pub use document::{render_certificate, render_document, RenderedCertificate};
#[cfg(feature = "render")]
pub use qr::QrImage;
