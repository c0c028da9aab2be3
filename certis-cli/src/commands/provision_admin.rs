//! Provision-admin command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use certis_server::{open_stores, provision_admin};
use colored::Colorize;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::utils::{read_password, store_config};

/// Where the password comes from.
pub enum PasswordSource {
    Argument(Zeroizing<String>),
    Stdin,
}

/// Execute the provision-admin command.
pub async fn execute(
    username: String,
    password: PasswordSource,
    data_dir: PathBuf,
    database_url: Option<String>,
    quiet: bool,
) -> Result<()> {
    let password = match password {
        PasswordSource::Argument(password) => {
            warn!("Password passed on the command line; prefer --password-stdin");
            password
        }
        PasswordSource::Stdin => read_password(std::io::stdin().lock())?,
    };

    let config = store_config(data_dir, database_url);
    let (_, admins) = open_stores(&config)
        .await
        .context("Failed to open admin store")?;

    let admin = provision_admin(&admins, &username, password)
        .await
        .context("Failed to provision admin")?;

    info!(
        username = %admin.username,
        backend = admins.backend_name(),
        "Admin provisioned"
    );

    if !quiet {
        println!(
            "{} {} {}",
            "Provisioned admin".green().bold(),
            admin.username.bold(),
            format!("({})", admin.id).dimmed()
        );
        if config.database_url.is_none() {
            println!(
                "   {} {}",
                "Store:".dimmed(),
                config.admin_store_path().display()
            );
        }
    }

    Ok(())
}
