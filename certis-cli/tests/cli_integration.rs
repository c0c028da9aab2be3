//! CLI integration tests for certis-cli.
//!
//! These tests run the actual binary against temporary data directories and
//! check outputs, exit codes, and store files.

use assert_cmd::Command;
use certis_core::{
    compute_fingerprint, CertificateId, CertificateInput, CertificateRecord,
};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the certis binary with a clean environment.
fn certis() -> Command {
    let mut cmd = Command::cargo_bin("certis").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("DATA_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn seed_store(data_dir: &Path) -> CertificateRecord {
    let record = CertificateRecord::issue(CertificateInput::new(
        "Jane Doe",
        "12345",
        "Computer Science",
        "State University",
    ))
    .unwrap();
    fs::create_dir_all(data_dir).unwrap();
    fs::write(
        data_dir.join("certificates.json"),
        serde_json::to_vec_pretty(&vec![record.clone()]).unwrap(),
    )
    .unwrap();
    record
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    certis()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Academic certificate operator tool"))
        .stdout(predicate::str::contains("provision-admin"))
        .stdout(predicate::str::contains("fingerprint"))
        .stdout(predicate::str::contains("verify"));
}

#[test]
fn test_version_displays_version() {
    certis()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("certis"));
}

#[test]
fn test_help_shows_exit_codes() {
    certis()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("73"));
}

#[test]
fn test_provision_admin_requires_a_password_source() {
    let dir = TempDir::new().unwrap();

    certis()
        .args(["provision-admin", "--username", "registrar", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(2);

    assert!(!dir.path().join("admins.json").exists());
}

// ============================================================================
// Fingerprint Tests
// ============================================================================

#[test]
fn test_fingerprint_matches_library_computation() {
    let id = CertificateId::generate();
    let expected = compute_fingerprint(
        id.as_str(),
        "Jane Doe",
        "12345",
        "Computer Science",
        "State University",
    );

    certis()
        .args(["fingerprint", "--id", id.as_str()])
        .args(["--name", "Jane Doe", "--student-id", "12345"])
        .args(["--program", "Computer Science"])
        .args(["--institution", "State University"])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", expected)));
}

#[test]
fn test_fingerprint_rejects_blank_field() {
    certis()
        .args(["fingerprint", "--id", "CERT-123"])
        .args(["--name", "   ", "--student-id", "12345"])
        .args(["--program", "CS", "--institution", "State University"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("name"));
}

#[test]
fn test_fingerprint_rejects_malformed_id() {
    certis()
        .args(["fingerprint", "--id", "../etc/passwd"])
        .args(["--name", "Jane Doe", "--student-id", "12345"])
        .args(["--program", "CS", "--institution", "State University"])
        .assert()
        .code(64);
}

// ============================================================================
// Provision Admin Tests
// ============================================================================

#[test]
fn test_provision_admin_from_stdin_stores_argon2_hash() {
    let dir = TempDir::new().unwrap();

    certis()
        .args(["provision-admin", "--username", "registrar", "--password-stdin"])
        .arg("--data-dir")
        .arg(dir.path())
        .write_stdin("s3cret-passphrase\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("registrar"));

    let stored = fs::read_to_string(dir.path().join("admins.json")).unwrap();
    assert!(stored.contains("\"registrar\""));
    assert!(stored.contains("$argon2id$"));
    assert!(!stored.contains("s3cret-passphrase"));
}

#[test]
fn test_provision_admin_refuses_duplicates() {
    let dir = TempDir::new().unwrap();

    certis()
        .args(["provision-admin", "--username", "registrar"])
        .args(["--password", "first-password"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .success();
    let before = fs::read(dir.path().join("admins.json")).unwrap();

    certis()
        .args(["provision-admin", "--username", "registrar"])
        .args(["--password", "second-password"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .code(73)
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read(dir.path().join("admins.json")).unwrap(), before);
}

#[test]
fn test_provision_admin_rejects_short_password() {
    let dir = TempDir::new().unwrap();

    certis()
        .args(["provision-admin", "--username", "registrar", "--password-stdin"])
        .arg("--data-dir")
        .arg(dir.path())
        .write_stdin("short\n")
        .assert()
        .code(64)
        .stderr(predicate::str::contains("at least"));

    assert!(!dir.path().join("admins.json").exists());
}

// ============================================================================
// Verify Tests
// ============================================================================

#[test]
fn test_verify_known_fingerprint() {
    let dir = TempDir::new().unwrap();
    let record = seed_store(dir.path());

    certis()
        .args(["verify", &record.certificate_hash.to_uppercase()])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("VERIFIED"))
        .stdout(predicate::str::contains("Jane Doe"))
        .stdout(predicate::str::contains(record.certificate_id.as_str()));
}

#[test]
fn test_verify_unknown_fingerprint_exits_65() {
    let dir = TempDir::new().unwrap();
    let record = seed_store(dir.path());
    let mut altered = record.certificate_hash.clone().into_bytes();
    altered[0] = if altered[0] == b'0' { b'1' } else { b'0' };
    let altered = String::from_utf8(altered).unwrap();

    certis()
        .args(["verify", &altered])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .code(65)
        .stdout(predicate::str::contains("NOT VERIFIED"));
}

#[test]
fn test_verify_malformed_input_exits_65() {
    let dir = TempDir::new().unwrap();

    certis()
        .args(["--quiet", "verify", "not-a-fingerprint"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .code(65)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_verify_reports_corrupt_store() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("certificates.json"), "{ not json").unwrap();

    certis()
        .args(["verify", &"a".repeat(64)])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .code(74)
        .stderr(predicate::str::contains("certificates.json"));

    assert_eq!(
        fs::read_to_string(dir.path().join("certificates.json")).unwrap(),
        "{ not json"
    );
}
