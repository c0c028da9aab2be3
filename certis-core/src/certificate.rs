use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CertisError, Result};

/// Prefix shared by every certificate identifier.
pub const CERTIFICATE_ID_PREFIX: &str = "CERT-";

/// Length of a hex-encoded SHA-256 fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Format of `issue_date` on records and documents.
pub const ISSUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper bound on identifier length, keeps artifact file names sane.
const MAX_CERTIFICATE_ID_LEN: usize = 80;

/// Opaque, globally unique certificate identifier.
///
/// Freshly issued ids are `CERT-` followed by a random UUIDv4. Parsing is
/// more lenient (any `CERT-` prefixed ASCII alphanumeric/hyphen string) so
/// that older timestamp-style identifiers still load, but never admits path
/// separators: the id is used verbatim as an artifact file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertificateId(String);

impl CertificateId {
    /// Generate a new random identifier.
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            CERTIFICATE_ID_PREFIX,
            uuid::Uuid::new_v4().hyphenated()
        ))
    }

    /// Parse and validate an identifier supplied from outside.
    pub fn parse(value: &str) -> Result<Self> {
        let suffix = value
            .strip_prefix(CERTIFICATE_ID_PREFIX)
            .ok_or_else(|| CertisError::InvalidCertificateId(value.to_string()))?;

        let well_formed = !suffix.is_empty()
            && value.len() <= MAX_CERTIFICATE_ID_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');

        if well_formed {
            Ok(Self(value.to_string()))
        } else {
            Err(CertisError::InvalidCertificateId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CertificateId {
    type Error = CertisError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CertificateId> for String {
    fn from(id: CertificateId) -> Self {
        id.0
    }
}

/// Business fields supplied by the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInput {
    pub name: String,
    pub student_id: String,
    pub program: String,
    pub institution: String,
}

impl CertificateInput {
    pub fn new(
        name: impl Into<String>,
        student_id: impl Into<String>,
        program: impl Into<String>,
        institution: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            student_id: student_id.into(),
            program: program.into(),
            institution: institution.into(),
        }
    }

    /// Reject blank fields. Values are otherwise kept byte for byte, since
    /// the fingerprint is computed over exactly what was submitted.
    ///
    /// Runs before any side effect of issuance.
    pub fn validated(self) -> Result<Self> {
        require_field("name", &self.name)?;
        require_field("student_id", &self.student_id)?;
        require_field("program", &self.program)?;
        require_field("institution", &self.institution)?;
        Ok(self)
    }
}

fn require_field(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(CertisError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Compute the certificate fingerprint.
///
/// SHA-256 over the UTF-8 bytes of `certificate_id ‖ name ‖ student_id ‖
/// program ‖ institution`, concatenated in that order with no separators,
/// rendered as lowercase hex. The layout is an external contract: anyone
/// holding the five values can recompute it.
pub fn compute_fingerprint(
    certificate_id: &str,
    name: &str,
    student_id: &str,
    program: &str,
    institution: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(certificate_id.as_bytes());
    hasher.update(name.as_bytes());
    hasher.update(student_id.as_bytes());
    hasher.update(program.as_bytes());
    hasher.update(institution.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalise a fingerprint submitted for lookup.
///
/// Returns `None` when the value cannot be a fingerprint at all (wrong length
/// or non-hex characters), which callers treat as a plain negative result.
pub fn normalize_fingerprint(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.len() == FINGERPRINT_HEX_LEN && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(trimmed.to_ascii_lowercase())
    } else {
        None
    }
}

/// The persisted certificate metadata record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub certificate_id: CertificateId,
    pub name: String,
    pub student_id: String,
    pub program: String,
    pub institution: String,
    /// Issue date, `YYYY-MM-DD`
    pub issue_date: String,
    /// Lowercase hex SHA-256 fingerprint, see [`compute_fingerprint`]
    pub certificate_hash: String,
}

impl CertificateRecord {
    /// Create a record for a new issuance: fresh id, today's date (UTC).
    pub fn issue(input: CertificateInput) -> Result<Self> {
        Self::issue_with(CertificateId::generate(), input, Utc::now().date_naive())
    }

    /// Create a record with an explicit identifier and issue date.
    pub fn issue_with(
        certificate_id: CertificateId,
        input: CertificateInput,
        issue_date: NaiveDate,
    ) -> Result<Self> {
        let input = input.validated()?;
        let certificate_hash = compute_fingerprint(
            certificate_id.as_str(),
            &input.name,
            &input.student_id,
            &input.program,
            &input.institution,
        );

        Ok(Self {
            certificate_id,
            name: input.name,
            student_id: input.student_id,
            program: input.program,
            institution: input.institution,
            issue_date: issue_date.format(ISSUE_DATE_FORMAT).to_string(),
            certificate_hash,
        })
    }

    /// Recompute the fingerprint from the stored fields and compare.
    pub fn fingerprint_matches(&self) -> bool {
        compute_fingerprint(
            self.certificate_id.as_str(),
            &self.name,
            &self.student_id,
            &self.program,
            &self.institution,
        ) == self.certificate_hash
    }

    /// Case-insensitive substring match on `student_id`.
    pub fn student_id_contains(&self, needle: &str) -> bool {
        self.student_id
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> CertificateInput {
        CertificateInput::new("Jane Doe", "12345", "Computer Science", "State University")
    }

    fn fixed_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_generated_id_shape() {
        let id = CertificateId::generate();
        assert!(id.as_str().starts_with(CERTIFICATE_ID_PREFIX));
        assert_eq!(id.as_str().len(), CERTIFICATE_ID_PREFIX.len() + 36);
        assert!(CertificateId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CertificateId::generate();
        let b = CertificateId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_legacy_timestamp_id() {
        assert!(CertificateId::parse("CERT-20240101120000").is_ok());
    }

    #[test]
    fn test_parse_rejects_unsafe_ids() {
        assert!(CertificateId::parse("").is_err());
        assert!(CertificateId::parse("CERT-").is_err());
        assert!(CertificateId::parse("cert-abc").is_err());
        assert!(CertificateId::parse("CERT-../etc/passwd").is_err());
        assert!(CertificateId::parse("CERT-abc/def").is_err());
        assert!(CertificateId::parse("CERT-abc.pdf").is_err());
        assert!(CertificateId::parse(&format!("CERT-{}", "a".repeat(100))).is_err());
    }

    #[test]
    fn test_certificate_id_deserialization_validates() {
        let ok: CertificateId = serde_json::from_str("\"CERT-abc-123\"").unwrap();
        assert_eq!(ok.as_str(), "CERT-abc-123");
        assert!(serde_json::from_str::<CertificateId>("\"../../x\"").is_err());
    }

    #[test]
    fn test_fingerprint_matches_sha256_of_concatenation() {
        let id = CertificateId::parse("CERT-0001").unwrap();
        let record = CertificateRecord::issue_with(id, jane(), fixed_date()).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"CERT-0001Jane Doe12345Computer ScienceState University");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(record.certificate_hash, expected);
        assert_eq!(record.certificate_hash.len(), FINGERPRINT_HEX_LEN);
        assert!(record.fingerprint_matches());
    }

    #[test]
    fn test_fingerprint_is_reproducible() {
        let a = compute_fingerprint("CERT-1", "a", "b", "c", "d");
        let b = compute_fingerprint("CERT-1", "a", "b", "c", "d");
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_fields_different_id_different_hash() {
        let a = CertificateRecord::issue(jane()).unwrap();
        let b = CertificateRecord::issue(jane()).unwrap();
        assert_ne!(a.certificate_id, b.certificate_id);
        assert_ne!(a.certificate_hash, b.certificate_hash);
    }

    #[test]
    fn test_any_field_change_changes_hash() {
        let base = compute_fingerprint("CERT-1", "Jane", "1", "CS", "SU");
        assert_ne!(base, compute_fingerprint("CERT-2", "Jane", "1", "CS", "SU"));
        assert_ne!(base, compute_fingerprint("CERT-1", "Jana", "1", "CS", "SU"));
        assert_ne!(base, compute_fingerprint("CERT-1", "Jane", "2", "CS", "SU"));
        assert_ne!(base, compute_fingerprint("CERT-1", "Jane", "1", "EE", "SU"));
        assert_ne!(base, compute_fingerprint("CERT-1", "Jane", "1", "CS", "MU"));
    }

    #[test]
    fn test_issue_keeps_fields_as_submitted() {
        let input = CertificateInput::new(" Jane Doe ", "12345", "CS", "SU\t");
        let record = CertificateRecord::issue_with(
            CertificateId::parse("CERT-x").unwrap(),
            input,
            fixed_date(),
        )
        .unwrap();
        assert_eq!(record.name, " Jane Doe ");
        assert_eq!(record.institution, "SU\t");
        assert_eq!(
            record.certificate_hash,
            compute_fingerprint("CERT-x", " Jane Doe ", "12345", "CS", "SU\t")
        );
        assert_eq!(record.issue_date, "2024-06-01");
    }

    #[test]
    fn test_issue_rejects_empty_field() {
        let input = CertificateInput::new("Jane", "   ", "CS", "SU");
        let err = CertificateRecord::issue(input).unwrap_err();
        assert!(matches!(err, CertisError::MissingField("student_id")));
        assert!(err.is_validation());
    }

    #[test]
    fn test_issue_accepts_long_fields() {
        let institution = "Institut ".repeat(40);
        let input = CertificateInput::new("Jane", "1", "CS", institution.clone());
        let record = CertificateRecord::issue(input).unwrap();
        assert_eq!(record.institution, institution);
        assert!(record.fingerprint_matches());
    }

    #[test]
    fn test_tampered_record_fails_fingerprint_check() {
        let mut record = CertificateRecord::issue(jane()).unwrap();
        record.program = "Law".to_string();
        assert!(!record.fingerprint_matches());
    }

    #[test]
    fn test_normalize_fingerprint() {
        let hash = "A".repeat(64);
        assert_eq!(normalize_fingerprint(&format!("  {}\n", hash)), Some("a".repeat(64)));
        assert_eq!(normalize_fingerprint("abc"), None);
        assert_eq!(normalize_fingerprint(&"g".repeat(64)), None);
    }

    #[test]
    fn test_student_id_filter_is_case_insensitive() {
        let input = CertificateInput::new("Jane", "ab-12345-XY", "CS", "SU");
        let record = CertificateRecord::issue(input).unwrap();
        assert!(record.student_id_contains("2345"));
        assert!(record.student_id_contains("xy"));
        assert!(record.student_id_contains("AB-1"));
        assert!(!record.student_id_contains("999"));
    }
}
