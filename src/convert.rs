//! Eager entry points and file output.
//!
//! [`convert_pdf`] waits for every page and returns them together; use
//! [`crate::stream::render_stream`] instead to handle pages as they come.
//! The `write_*` helpers put results on disk atomically: data goes to a
//! temporary file in the destination directory, which is then renamed over
//! the target, so a crash never leaves a half-written file behind.

use crate::archive::build_archive;
use crate::compose::compose_images;
use crate::config::{ComposeConfig, RasterConfig};
use crate::error::PdfImgError;
use crate::output::{ComposedDocument, DocumentInfo, RasterOutput, RenderedPage};
use crate::pipeline::input::SourceImage;
use crate::pipeline::render::{PdfiumEngine, RasterEngine};
use crate::rasterize::Rasterizer;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise every selected page of a PDF with pdfium.
///
/// # Returns
/// `Ok(RasterOutput)` even when some pages failed; check
/// `output.failures`.
///
/// # Errors
/// Only fatal errors: pdfium missing, not a PDF, unparseable or encrypted
/// document, a page selection outside the document.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfimg::{convert_pdf, RasterConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("document.pdf")?;
/// let output = convert_pdf(bytes, &RasterConfig::default()).await?;
/// for page in &output.pages {
///     std::fs::write(page.file_name(), &page.data)?;
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_pdf(
    bytes: Vec<u8>,
    config: &RasterConfig,
) -> Result<RasterOutput, PdfImgError> {
    convert_pdf_with(PdfiumEngine::bind, bytes, config).await
}

/// [`convert_pdf`] with a custom engine, constructed on the blocking thread.
pub async fn convert_pdf_with<E, F>(
    factory: F,
    bytes: Vec<u8>,
    config: &RasterConfig,
) -> Result<RasterOutput, PdfImgError>
where
    E: RasterEngine,
    F: FnOnce() -> Result<E, PdfImgError> + Send + 'static,
{
    let config = config.clone();
    let output = tokio::task::spawn_blocking(move || {
        let rasterizer = Rasterizer::new(factory()?, config);
        let doc = rasterizer.open(bytes)?;
        doc.render_all(rasterizer.config().scale, |_| {})
    })
    .await
    .map_err(|e| PdfImgError::Internal(format!("render task failed: {e}")))??;

    info!(
        "Conversion complete: {}/{} pages, {}ms",
        output.stats.rendered_pages, output.stats.selected_pages, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Page count and nominal page sizes, without rendering anything.
pub async fn inspect(bytes: Vec<u8>) -> Result<DocumentInfo, PdfImgError> {
    inspect_with(PdfiumEngine::bind, bytes, None).await
}

/// [`inspect`] with a custom engine and an optional password.
pub async fn inspect_with<E, F>(
    factory: F,
    bytes: Vec<u8>,
    password: Option<String>,
) -> Result<DocumentInfo, PdfImgError>
where
    E: RasterEngine,
    F: FnOnce() -> Result<E, PdfImgError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut builder = RasterConfig::builder();
        if let Some(pwd) = password {
            builder = builder.password(pwd);
        }
        let rasterizer = Rasterizer::new(factory()?, builder.build()?);
        let doc = rasterizer.open(bytes)?;
        Ok(DocumentInfo {
            page_count: doc.page_count(),
            page_sizes: doc.page_sizes()?,
        })
    })
    .await
    .map_err(|e| PdfImgError::Internal(format!("inspect task failed: {e}")))?
}

/// Read image files in order and compose them into one PDF at `output_path`.
pub async fn images_to_pdf_file(
    image_paths: &[PathBuf],
    output_path: impl AsRef<Path>,
    config: &ComposeConfig,
) -> Result<ComposedDocument, PdfImgError> {
    if image_paths.is_empty() {
        return Err(PdfImgError::EmptyInput);
    }
    let mut images = Vec::with_capacity(image_paths.len());
    for path in image_paths {
        images.push(SourceImage::from_path(path).await?);
    }

    let doc = compose_images(images, config).await?;
    write_atomic(output_path.as_ref(), doc.data.clone()).await?;
    Ok(doc)
}

/// Write each page to `dir` as `page_<n>.jpg`. Returns the written paths.
pub async fn write_pages(
    pages: &[RenderedPage],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, PdfImgError> {
    let dir = dir.as_ref();
    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = dir.join(page.file_name());
        write_atomic(&path, page.data.clone()).await?;
        written.push(path);
    }
    Ok(written)
}

/// Pack `pages` into a ZIP archive at `path`.
pub async fn write_archive(
    pages: &[RenderedPage],
    path: impl AsRef<Path>,
) -> Result<usize, PdfImgError> {
    let bytes = build_archive(pages)?;
    let size = bytes.len();
    write_atomic(path.as_ref(), bytes).await?;
    Ok(size)
}

/// Write `data` to `path` via a temporary file in the same directory.
pub async fn write_atomic(path: &Path, data: Vec<u8>) -> Result<(), PdfImgError> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let write_err = |source: std::io::Error| PdfImgError::OutputWriteFailed {
            path: target.clone(),
            source,
        };
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(&data).map_err(write_err)?;
        tmp.persist(&target).map_err(|e| write_err(e.error))?;
        debug!("Wrote {} ({} bytes)", target.display(), data.len());
        Ok(())
    })
    .await
    .map_err(|e| PdfImgError::Internal(format!("write task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;
    use crate::pipeline::render::fake::{fake_pdf, FakeEngine};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    #[tokio::test]
    async fn convert_collects_pages_and_stats() {
        let engine = FakeEngine::uniform(3, PageSize::LETTER).failing_on(3);
        let output = convert_pdf_with(move || Ok(engine), fake_pdf(), &RasterConfig::default())
            .await
            .unwrap();

        assert_eq!(output.page_count, 3);
        assert_eq!(output.pages.len(), 2);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.stats.rendered_pages, 2);
        assert_eq!(
            output.stats.output_bytes,
            output.pages.iter().map(|p| p.data.len()).sum::<usize>()
        );
        assert_eq!((output.pages[0].width, output.pages[0].height), (1224, 1584));
    }

    #[tokio::test]
    async fn convert_rejects_non_pdf() {
        let err = convert_pdf_with(
            || Ok(FakeEngine::default()),
            b"\x89PNG\r\n\x1a\n".to_vec(),
            &RasterConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PdfImgError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn inspect_reports_sizes() {
        let engine = FakeEngine::with_pages(vec![PageSize::A4, PageSize::LETTER.landscape()]);
        let info = inspect_with(move || Ok(engine), fake_pdf(), None).await.unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.page_sizes[1], PageSize::new(792.0, 612.0));
    }

    #[tokio::test]
    async fn pages_are_written_with_conventional_names() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::uniform(2, PageSize::new(20.0, 20.0));
        let output = convert_pdf_with(move || Ok(engine), fake_pdf(), &RasterConfig::default())
            .await
            .unwrap();

        let out_dir = dir.path().join("nested/out");
        let written = write_pages(&output.pages, &out_dir).await.unwrap();
        assert_eq!(written, vec![out_dir.join("page_1.jpg"), out_dir.join("page_2.jpg")]);
        assert_eq!(std::fs::read(&written[0]).unwrap(), output.pages[0].data);

        let zip_path = dir.path().join("doc_images.zip");
        let size = write_archive(&output.pages, &zip_path).await.unwrap();
        assert_eq!(std::fs::metadata(&zip_path).unwrap().len() as usize, size);
    }

    #[tokio::test]
    async fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary file left behind");
    }

    #[tokio::test]
    async fn images_from_disk_to_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, (w, h)) in [(40, 30), (30, 40)].iter().enumerate() {
            let path = dir.path().join(format!("img{i}.png"));
            DynamicImage::ImageRgb8(RgbImage::from_pixel(*w, *h, Rgb([0, 0, 0])))
                .save_with_format(&path, ImageFormat::Png)
                .unwrap();
            paths.push(path);
        }

        let out = dir.path().join("converted_images.pdf");
        let doc = images_to_pdf_file(&paths, &out, &ComposeConfig::default())
            .await
            .unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].name, "img1.png");

        let pdf = lopdf::Document::load(&out).unwrap();
        assert_eq!(pdf.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn missing_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = images_to_pdf_file(
            &[dir.path().join("nope.jpg")],
            dir.path().join("out.pdf"),
            &ComposeConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PdfImgError::FileNotFound { .. }));
        assert!(!dir.path().join("out.pdf").exists());
    }
}
