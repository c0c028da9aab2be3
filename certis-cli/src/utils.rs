//! Common utility functions shared across CLI commands.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use certis_server::{Config, CorruptStorePolicy};
use zeroize::Zeroizing;

/// Server configuration pointing at a local data directory.
///
/// The CLI never treats a corrupt store as empty: it would report a
/// negative verification for every certificate.
pub fn store_config(data_dir: PathBuf, database_url: Option<String>) -> Config {
    Config {
        data_dir,
        database_url: database_url.filter(|url| !url.trim().is_empty()),
        database_max_connections: 1,
        database_min_connections: 0,
        corrupt_store_policy: CorruptStorePolicy::Fail,
        ..Config::default()
    }
}

/// Read a password from the first line of `reader`, without its line ending.
pub fn read_password(mut reader: impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        bail!("No password provided on stdin");
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_password_strips_line_ending() {
        let password = read_password(Cursor::new("correct horse\r\nignored\n")).unwrap();
        assert_eq!(password.as_str(), "correct horse");
    }

    #[test]
    fn test_read_password_rejects_empty_input() {
        assert!(read_password(Cursor::new("")).is_err());
        assert!(read_password(Cursor::new("\n")).is_err());
    }

    #[test]
    fn test_store_config_is_strict_file_backend() {
        let config = store_config(PathBuf::from("/tmp/certis"), Some("  ".into()));
        assert!(config.database_url.is_none());
        assert_eq!(config.corrupt_store_policy, CorruptStorePolicy::Fail);
        assert_eq!(
            config.certificate_store_path(),
            PathBuf::from("/tmp/certis/certificates.json")
        );
    }
}
