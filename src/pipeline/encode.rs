//! Image encoding: rendered `DynamicImage` → JPEG bytes.
//!
//! Pages are delivered as JPEG at a high quality factor (95 by default):
//! small enough to bundle hundreds of pages in one archive, sharp enough
//! that rendered text stays readable. JPEG has no alpha channel, so the
//! bitmap is flattened to RGB first; pdfium already paints the page on a
//! white background.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rendered page as JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;

    debug!(
        "Encoded {}x{} page → {} bytes JPEG (q={})",
        rgb.width(),
        rgb.height(),
        buf.len(),
        quality
    );
    Ok(buf)
}
