//! Bundling rendered pages into a single ZIP download.
//!
//! Layout: one `converted_images/` folder holding `page_<n>.jpg` for every
//! page that rendered. Failed pages are simply absent.

use crate::error::PdfImgError;
use crate::output::RenderedPage;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Folder inside the archive that holds the pages.
pub const ARCHIVE_FOLDER: &str = "converted_images";

/// Pack `pages` into an in-memory ZIP archive.
pub fn build_archive(pages: &[RenderedPage]) -> Result<Vec<u8>, PdfImgError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.add_directory(format!("{ARCHIVE_FOLDER}/"), options)
        .map_err(|e| PdfImgError::Archive(e.to_string()))?;

    for page in pages {
        let entry = format!("{}/{}", ARCHIVE_FOLDER, page.file_name());
        zip.start_file(entry.as_str(), options)
            .map_err(|e| PdfImgError::Archive(e.to_string()))?;
        zip.write_all(&page.data)
            .map_err(|e| PdfImgError::Archive(format!("{entry}: {e}")))?;
    }

    let bytes = zip
        .finish()
        .map_err(|e| PdfImgError::Archive(e.to_string()))?
        .into_inner();
    debug!("Archived {} pages into {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}
