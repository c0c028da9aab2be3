use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertisError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid certificate id: {0}")]
    InvalidCertificateId(String),

    #[error("QR code error: {0}")]
    QrCode(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl CertisError {
    /// Whether the error was caused by caller-supplied input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::InvalidCertificateId(_))
    }
}

pub type Result<T> = std::result::Result<T, CertisError>;
