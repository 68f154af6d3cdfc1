//! Input handling: read user-supplied files and validate them up front.
//!
//! Both pipelines take raw bytes. This module turns paths into those bytes
//! with meaningful errors (missing file, permission denied) and rejects
//! obviously wrong input (a PDF buffer without the `%PDF` signature, an
//! image that is neither JPEG nor PNG) before any engine sees it.

use crate::error::PdfImgError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// MIME types accepted for image → PDF.
pub const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// A user-supplied raster image: bytes plus the name it was selected under.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Original file name, e.g. `holiday.jpg`.
    pub name: String,
    /// Encoded image bytes as selected by the user.
    pub data: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Size of the encoded image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// MIME type sniffed from the leading bytes, if JPEG or PNG.
    pub fn mime_type(&self) -> Option<&'static str> {
        sniff_image_mime(&self.data)
    }

    /// Load an image from disk. See [`read_source_image`].
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PdfImgError> {
        read_source_image(path.as_ref()).await
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .field("mime_type", &self.mime_type())
            .finish()
    }
}

/// Identify JPEG/PNG data by signature.
pub fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => Some("image/jpeg"),
        Ok(image::ImageFormat::Png) => Some("image/png"),
        _ => None,
    }
}

/// How far into a buffer the `%PDF-` header may appear.
pub const PDF_HEADER_WINDOW: usize = 1024;

/// Offset of the `%PDF-` header within the first [`PDF_HEADER_WINDOW`] bytes.
///
/// Leading whitespace, a BOM or gateway junk before the header is tolerated,
/// the same as PDF readers do.
pub fn find_pdf_header(data: &[u8]) -> Option<usize> {
    let head = &data[..data.len().min(PDF_HEADER_WINDOW)];
    head.windows(5).position(|w| w == b"%PDF-")
}

/// Reject buffers with no `%PDF-` header near the start.
pub fn validate_pdf_bytes(data: &[u8]) -> Result<(), PdfImgError> {
    if find_pdf_header(data).is_some() {
        Ok(())
    } else {
        Err(PdfImgError::NotAPdf {
            magic: data.iter().take(4).copied().collect(),
        })
    }
}

/// Read a whole file, mapping I/O failures to library errors.
pub async fn read_file(path: &Path) -> Result<Vec<u8>, PdfImgError> {
    let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PdfImgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => PdfImgError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => PdfImgError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    })?;
    debug!("Read {} ({} bytes)", path.display(), data.len());
    Ok(data)
}

/// Read a PDF from disk and check its signature.
pub async fn read_pdf(path: &Path) -> Result<Vec<u8>, PdfImgError> {
    let data = read_file(path).await?;
    validate_pdf_bytes(&data)?;
    Ok(data)
}

/// Read an image from disk, named after its file name.
///
/// The format is not checked here; unsupported files are reported by the
/// composer with their position in the sequence.
pub async fn read_source_image(path: &Path) -> Result<SourceImage, PdfImgError> {
    let data = read_file(path).await?;
    Ok(SourceImage::new(file_name_of(path), data))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Archive file name for a source PDF: `report.pdf` → `report_images.zip`.
pub fn archive_name_for(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    PathBuf::from(format!("{stem}_images.zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_SIG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG_SIG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn pdf_signature_is_required() {
        assert!(validate_pdf_bytes(b"%PDF-1.7\n...").is_ok());
        match validate_pdf_bytes(b"GIF89a") {
            Err(PdfImgError::NotAPdf { magic }) => assert_eq!(magic, b"GIF8"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
        assert!(matches!(
            validate_pdf_bytes(b""),
            Err(PdfImgError::NotAPdf { .. })
        ));
    }

    #[test]
    fn pdf_header_after_leading_bytes() {
        assert!(validate_pdf_bytes(b"\r\n%PDF-1.5\n...").is_ok());
        assert!(validate_pdf_bytes(b"\xEF\xBB\xBF%PDF-1.4\n").is_ok());
        assert_eq!(find_pdf_header(b"X-Mailer: gw\n\n%PDF-1.7"), Some(14));

        let mut late = vec![b' '; PDF_HEADER_WINDOW];
        late.extend_from_slice(b"%PDF-1.7");
        match validate_pdf_bytes(&late) {
            Err(PdfImgError::NotAPdf { magic }) => assert_eq!(magic, b"    "),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
        assert!(validate_pdf_bytes(b"%PDF").is_err());
    }

    #[test]
    fn sniffs_jpeg_and_png_only() {
        let mut png = PNG_SIG.to_vec();
        png.extend_from_slice(&[0; 16]);
        assert_eq!(sniff_image_mime(&png), Some("image/png"));

        let mut jpeg = JPEG_SIG.to_vec();
        jpeg.extend_from_slice(&[0; 16]);
        assert_eq!(sniff_image_mime(&jpeg), Some("image/jpeg"));

        assert_eq!(sniff_image_mime(b"GIF89a\0\0\0\0"), None);
        assert_eq!(sniff_image_mime(b"%PDF-1.4"), None);
    }

    #[test]
    fn source_image_reports_size() {
        let img = SourceImage::new("a.png", vec![1, 2, 3]);
        assert_eq!(img.size(), 3);
        assert_eq!(img.mime_type(), None);
    }

    #[test]
    fn archive_name_strips_extension() {
        assert_eq!(
            archive_name_for(Path::new("/tmp/report.pdf")),
            PathBuf::from("report_images.zip")
        );
        assert_eq!(
            archive_name_for(Path::new("scan.v2.PDF")),
            PathBuf::from("scan.v2_images.zip")
        );
    }

    #[tokio::test]
    async fn read_missing_file() {
        let err = read_file(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfImgError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn read_pdf_checks_signature() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"not a pdf at all").unwrap();
        let err = read_pdf(tmp.path()).await.unwrap_err();
        assert!(matches!(err, PdfImgError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn read_source_image_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        std::fs::write(&path, PNG_SIG).unwrap();
        let img = SourceImage::from_path(&path).await.unwrap();
        assert_eq!(img.name, "cover.png");
        assert_eq!(img.size(), PNG_SIG.len());
    }
}
