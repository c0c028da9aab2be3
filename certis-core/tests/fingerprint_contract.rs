//! External contract tests for the certificate fingerprint.
//!
//! A verifier outside this codebase only knows the documented layout
//! (`certificate_id ‖ name ‖ student_id ‖ program ‖ institution`, SHA-256,
//! lowercase hex). These tests recompute it independently.

use certis_core::{
    compute_fingerprint, normalize_fingerprint, CertificateId, CertificateInput,
    CertificateRecord, FINGERPRINT_HEX_LEN,
};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

fn independent_digest(parts: &[&str]) -> String {
    let joined: String = parts.concat();
    let digest = Sha256::digest(joined.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[test]
fn test_known_vector() {
    // sha256("CERT-20240101120000Jane Doe12345Computer ScienceState University")
    let id = CertificateId::parse("CERT-20240101120000").unwrap();
    let record = CertificateRecord::issue_with(
        id,
        CertificateInput::new("Jane Doe", "12345", "Computer Science", "State University"),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    )
    .unwrap();

    assert_eq!(
        record.certificate_hash,
        independent_digest(&[
            "CERT-20240101120000",
            "Jane Doe",
            "12345",
            "Computer Science",
            "State University",
        ])
    );
}

#[test]
fn test_issued_records_are_externally_recomputable() {
    let inputs = [
        ("Jane Doe", "12345", "Computer Science", "State University"),
        ("Budi Santoso", "1301190001", "Informatika", "Universitas Telkom"),
        ("José Álvarez", "A-77", "Mathematics", "Universidad Nacional"),
    ];

    for (name, student_id, program, institution) in inputs {
        let record =
            CertificateRecord::issue(CertificateInput::new(name, student_id, program, institution))
                .unwrap();

        let expected = independent_digest(&[
            record.certificate_id.as_str(),
            name,
            student_id,
            program,
            institution,
        ]);

        assert_eq!(record.certificate_hash, expected);
        assert_eq!(record.certificate_hash.len(), FINGERPRINT_HEX_LEN);
        assert_eq!(
            normalize_fingerprint(&record.certificate_hash.to_uppercase()),
            Some(record.certificate_hash.clone())
        );
    }
}

#[test]
fn test_digest_covers_fields_exactly_as_submitted() {
    let record = CertificateRecord::issue(CertificateInput::new(
        " Jane Doe ",
        "12345",
        "Computer Science",
        "State University",
    ))
    .unwrap();

    assert_eq!(record.name, " Jane Doe ");
    assert_eq!(
        record.certificate_hash,
        independent_digest(&[
            record.certificate_id.as_str(),
            " Jane Doe ",
            "12345",
            "Computer Science",
            "State University",
        ])
    );
}

#[test]
fn test_no_separator_layout_is_part_of_the_contract() {
    // Shifting characters between adjacent fields keeps the concatenation,
    // and therefore the digest, identical. Documented, not a bug.
    let a = compute_fingerprint("CERT-1", "Jane", "D12", "CS", "SU");
    let b = compute_fingerprint("CERT-1", "JaneD", "12", "CS", "SU");
    assert_eq!(a, b);
}

#[cfg(feature = "render")]
#[test]
fn test_rendered_qr_matches_record_fingerprint() {
    use certis_core::{render_certificate, QrImage};

    let record = CertificateRecord::issue(CertificateInput::new(
        "Jane Doe",
        "12345",
        "Computer Science",
        "State University",
    ))
    .unwrap();

    let rendered = render_certificate(&record).unwrap();
    let expected_png = QrImage::encode(&record.certificate_hash)
        .unwrap()
        .to_png()
        .unwrap();

    assert_eq!(rendered.qr_png, expected_png);
    assert!(rendered.document.starts_with(b"%PDF-"));
}
