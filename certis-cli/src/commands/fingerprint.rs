//! Fingerprint command implementation.
//!
//! Recomputes a certificate fingerprint from its five bound values, the same
//! way any third party holding a printed certificate can.

use anyhow::{Context, Result};
use certis_core::{compute_fingerprint, CertificateId, CertificateInput};

/// Execute the fingerprint command. Prints the lowercase hex digest.
pub fn execute(
    certificate_id: &str,
    name: &str,
    student_id: &str,
    program: &str,
    institution: &str,
) -> Result<()> {
    let id = CertificateId::parse(certificate_id).context("Invalid --id")?;
    let input = CertificateInput::new(name, student_id, program, institution)
        .validated()
        .context("Invalid certificate fields")?;

    let hash = compute_fingerprint(
        id.as_str(),
        &input.name,
        &input.student_id,
        &input.program,
        &input.institution,
    );

    println!("{}", hash);
    Ok(())
}
