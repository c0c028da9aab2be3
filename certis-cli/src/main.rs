//! Certis CLI - operator tool for academic certificates.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

mod commands;
mod exit_codes;
mod utils;

use commands::provision_admin::PasswordSource;
use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "certis")]
#[command(author, version, about = "Academic certificate operator tool", long_about = None)]
#[command(after_help = "Exit codes:
  0   Success
  1   General error
  64  Invalid arguments or certificate fields
  65  Certificate not verified
  69  Database unavailable
  73  Admin already exists
  74  Store unreadable, corrupt or not writable")]
struct Cli {
    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an admin account that can log in to the server
    ProvisionAdmin {
        /// Login name
        #[arg(long)]
        username: String,

        /// Password (visible in the process list; prefer --password-stdin)
        #[arg(long, conflicts_with = "password_stdin", required_unless_present = "password_stdin")]
        password: Option<String>,

        /// Read the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,

        /// Directory holding admins.json and certificates.json
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Provision into PostgreSQL instead of the data directory
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Recompute a certificate fingerprint from its printed values
    Fingerprint {
        /// Certificate identifier (CERT-...)
        #[arg(long = "id")]
        certificate_id: String,

        /// Holder name
        #[arg(long)]
        name: String,

        /// Student identifier
        #[arg(long)]
        student_id: String,

        /// Academic program
        #[arg(long)]
        program: String,

        /// Issuing institution
        #[arg(long)]
        institution: String,
    },

    /// Check a fingerprint against the local certificate store
    Verify {
        /// SHA-256 fingerprint (64 hex characters)
        #[arg(value_name = "HASH")]
        hash: String,

        /// Directory holding certificates.json
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Look up in PostgreSQL instead of the data directory
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "certis_cli=info,certis_server=info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;

    match cli.command {
        Commands::ProvisionAdmin {
            username,
            password,
            password_stdin,
            data_dir,
            database_url,
        } => {
            let source = match password {
                Some(password) if !password_stdin => {
                    PasswordSource::Argument(Zeroizing::new(password))
                }
                _ => PasswordSource::Stdin,
            };
            commands::provision_admin::execute(username, source, data_dir, database_url, quiet)
                .await
        }
        Commands::Fingerprint {
            certificate_id,
            name,
            student_id,
            program,
            institution,
        } => commands::fingerprint::execute(
            &certificate_id,
            &name,
            &student_id,
            &program,
            &institution,
        ),
        Commands::Verify {
            hash,
            data_dir,
            database_url,
        } => commands::verify::execute(hash, data_dir, database_url, quiet).await,
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    std::process::ExitCode::from(u8::try_from(exit.code).unwrap_or(1))
}
