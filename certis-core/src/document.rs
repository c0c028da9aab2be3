//! PDF certificate document rendering.

use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference,
};

use crate::certificate::CertificateRecord;
use crate::error::{CertisError, Result};
use crate::qr::QrImage;

/// A4 portrait
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

const MARGIN_MM: f32 = 35.0;
const TITLE: &str = "DIGITAL ACADEMIC CERTIFICATE";
const TITLE_SIZE_PT: f32 = 20.0;
const BODY_SIZE_PT: f32 = 12.0;
const FINGERPRINT_SIZE_PT: f32 = 8.0;
const LINE_SPACING_MM: f32 = 10.0;
const LABEL_COLUMN_MM: f32 = 38.0;
const QR_SIZE_MM: f32 = 42.0;
const MM_PER_PT: f32 = 0.3528;
/// Average Helvetica-Bold glyph advance, as a fraction of the font size.
const AVG_GLYPH_WIDTH_EM: f32 = 0.6;

/// Both artifacts produced for one certificate.
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    /// PDF document bytes
    pub document: Vec<u8>,
    /// PNG bytes of the QR code encoding the fingerprint
    pub qr_png: Vec<u8>,
}

/// Render the QR code and the PDF document for a record.
///
/// CPU-bound; async callers should run it on a blocking thread.
pub fn render_certificate(record: &CertificateRecord) -> Result<RenderedCertificate> {
    let qr = QrImage::encode(&record.certificate_hash)?;
    let qr_png = qr.to_png()?;
    let document = render_document(record, &qr)?;

    tracing::debug!(
        certificate_id = %record.certificate_id,
        document_bytes = document.len(),
        qr_bytes = qr_png.len(),
        "Rendered certificate artifacts"
    );

    Ok(RenderedCertificate { document, qr_png })
}

fn render_err(e: impl std::fmt::Display) -> CertisError {
    CertisError::Render(e.to_string())
}

/// Render the A4 certificate page with the QR code in the lower right corner.
pub fn render_document(record: &CertificateRecord, qr: &QrImage) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Certificate {}", record.certificate_id),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Certificate",
    );

    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render_err)?;
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_err)?;
    let mono = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(render_err)?;

    let layer = doc.get_page(page).get_layer(layer);

    let title_width = approx_text_width_mm(TITLE, TITLE_SIZE_PT);
    layer.use_text(
        TITLE,
        TITLE_SIZE_PT,
        Mm((PAGE_WIDTH_MM - title_width) / 2.0),
        Mm(PAGE_HEIGHT_MM - 28.0),
        &bold,
    );

    let fields = [
        ("Name", record.name.as_str()),
        ("Student ID", record.student_id.as_str()),
        ("Program", record.program.as_str()),
        ("Institution", record.institution.as_str()),
        ("Certificate ID", record.certificate_id.as_str()),
        ("Issue Date", record.issue_date.as_str()),
    ];

    let mut y = PAGE_HEIGHT_MM - 55.0;
    for (label, value) in fields {
        draw_field(&layer, &bold, &regular, label, value, y);
        y -= LINE_SPACING_MM;
    }

    y -= LINE_SPACING_MM / 2.0;
    layer.use_text("Fingerprint (SHA-256)", BODY_SIZE_PT, Mm(MARGIN_MM), Mm(y), &bold);
    layer.use_text(
        record.certificate_hash.as_str(),
        FINGERPRINT_SIZE_PT,
        Mm(MARGIN_MM),
        Mm(y - 6.0),
        &mono,
    );

    let qr_x = PAGE_WIDTH_MM - MARGIN_MM - QR_SIZE_MM;
    let qr_y = 30.0;
    qr_image(qr)?.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(qr_x)),
            translate_y: Some(Mm(qr_y)),
            dpi: Some(qr.size() as f32 * 25.4 / QR_SIZE_MM),
            ..Default::default()
        },
    );
    layer.use_text("Scan to verify", FINGERPRINT_SIZE_PT, Mm(qr_x), Mm(qr_y - 5.0), &regular);

    doc.save_to_bytes().map_err(render_err)
}

fn draw_field(
    layer: &PdfLayerReference,
    label_font: &IndirectFontRef,
    value_font: &IndirectFontRef,
    label: &str,
    value: &str,
    y: f32,
) {
    layer.use_text(label, BODY_SIZE_PT, Mm(MARGIN_MM), Mm(y), label_font);
    layer.use_text(
        format!(": {}", value),
        BODY_SIZE_PT,
        Mm(MARGIN_MM + LABEL_COLUMN_MM),
        Mm(y),
        value_font,
    );
}

/// Builtin fonts carry no metrics in printpdf; estimate from an average advance.
fn approx_text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_GLYPH_WIDTH_EM * MM_PER_PT
}

fn qr_image(qr: &QrImage) -> Result<Image> {
    let rgb: Vec<u8> = qr.pixels().iter().flat_map(|&p| [p, p, p]).collect();
    let bitmap = RgbImage::from_raw(qr.size(), qr.size(), rgb)
        .ok_or_else(|| CertisError::Render("QR bitmap has inconsistent dimensions".into()))?;

    Ok(Image::from_dynamic_image(&DynamicImage::ImageRgb8(bitmap)))
}
