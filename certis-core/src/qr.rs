//! QR code rendering for certificate fingerprints.
//!
//! The code encodes the fingerprint text verbatim so a scanner can submit it
//! straight to the verification endpoint.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{CertisError, Result};

/// Pixels per QR module.
pub const MODULE_PIXELS: u32 = 8;

/// A rendered QR symbol, quiet zone included, as an 8-bit grayscale bitmap.
#[derive(Debug, Clone)]
pub struct QrImage {
    image: GrayImage,
}

impl QrImage {
    /// Encode `text` at error correction level M.
    pub fn encode(text: &str) -> Result<Self> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
            .map_err(|e| CertisError::QrCode(e.to_string()))?;

        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
            .build();

        tracing::debug!(modules = code.width(), size = image.width(), "Rendered QR code");

        Ok(Self { image })
    }

    /// Edge length in pixels (the image is square).
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Row-major grayscale pixels, `size * size` bytes.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| CertisError::Render(format!("PNG encoding failed: {}", e)))?;

        Ok(bytes)
    }
}
