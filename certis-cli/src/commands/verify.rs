//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use certis_core::normalize_fingerprint;
use certis_server::open_stores;
use colored::Colorize;
use tracing::{debug, info};

use crate::exit_codes::NotVerified;
use crate::utils::store_config;

/// Execute the verify command against the local store.
pub async fn execute(
    hash: String,
    data_dir: PathBuf,
    database_url: Option<String>,
    quiet: bool,
) -> Result<()> {
    let config = store_config(data_dir, database_url);
    let (certificates, _) = open_stores(&config)
        .await
        .context("Failed to open certificate store")?;

    let record = match normalize_fingerprint(&hash) {
        Some(hash) => certificates
            .find_by_hash(&hash)
            .await
            .context("Failed to read certificate store")?,
        None => {
            debug!("Input is not a SHA-256 hex digest");
            None
        }
    };

    let Some(record) = record else {
        if !quiet {
            println!();
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!(
                "{}",
                "║             NOT VERIFIED               ║".red().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".red());
            println!();
            println!(
                "   {} {}",
                "Fingerprint:".dimmed(),
                hash.trim().red()
            );
        }
        return Err(NotVerified.into());
    };

    info!(certificate_id = %record.certificate_id, "Certificate verified");

    if !quiet {
        println!();
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║               VERIFIED                 ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
        println!("   {} {}", "Certificate:".dimmed(), record.certificate_id);
        println!("   {} {}", "Name:".dimmed(), record.name);
        println!("   {} {}", "Student ID:".dimmed(), record.student_id);
        println!("   {} {}", "Program:".dimmed(), record.program);
        println!("   {} {}", "Institution:".dimmed(), record.institution);
        println!("   {} {}", "Issued:".dimmed(), record.issue_date);
    }

    Ok(())
}
