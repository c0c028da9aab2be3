//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell a negative verification apart from
//! bad arguments or a broken data directory.

use certis_core::CertisError;
use certis_server::{ProvisionError, StoreError};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// The fingerprint does not belong to any issued certificate.
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Database unreachable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Admin already exists.
/// Maps to EX_CANTCREAT from sysexits.h.
pub const CANT_CREATE: i32 = 73;

/// Store unreadable, corrupt or not writable.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Returned by `verify` when the lookup completed but found nothing.
#[derive(Debug, thiserror::Error)]
#[error("Verification failed: no issued certificate has this fingerprint")]
pub struct NotVerified;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        Self {
            code: classify(err),
            message: Some(message),
        }
    }
}

fn classify(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.is::<NotVerified>() {
            return VERIFICATION_FAILED;
        }
        if let Some(e) = cause.downcast_ref::<ProvisionError>() {
            return match e {
                ProvisionError::InvalidUsername | ProvisionError::WeakPassword => USAGE_ERROR,
                ProvisionError::AlreadyExists(_) => CANT_CREATE,
                ProvisionError::Hash(_) => GENERAL_ERROR,
                ProvisionError::Store(store) => store_code(store),
            };
        }
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return store_code(e);
        }
        if let Some(e) = cause.downcast_ref::<CertisError>() {
            return if e.is_validation() {
                USAGE_ERROR
            } else {
                GENERAL_ERROR
            };
        }
    }
    GENERAL_ERROR
}

fn store_code(err: &StoreError) -> i32 {
    match err {
        StoreError::Connection(_) | StoreError::Migration(_) => UNAVAILABLE,
        _ => IO_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_not_verified_maps_to_dataerr() {
        let err = anyhow::Error::new(NotVerified);
        assert_eq!(ExitCode::from_anyhow(&err).code, VERIFICATION_FAILED);
    }

    #[test]
    fn test_classification_sees_through_context() {
        let err = Err::<(), _>(ProvisionError::AlreadyExists("registrar".into()))
            .context("Failed to provision admin")
            .unwrap_err();
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, CANT_CREATE);
        assert!(exit.message.unwrap().contains("already exists"));
    }

    #[test]
    fn test_validation_is_usage_error() {
        let err = anyhow::Error::new(CertisError::MissingField("name"));
        assert_eq!(ExitCode::from_anyhow(&err).code, USAGE_ERROR);
    }

    #[test]
    fn test_unknown_error_is_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_anyhow(&err).code, GENERAL_ERROR);
    }
}
