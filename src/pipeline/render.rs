//! PDF rasterisation engines.
//!
//! The rasteriser talks to the rendering engine through two small traits:
//! [`RasterEngine`] parses a byte buffer into a [`PageSource`], and a
//! `PageSource` reports page geometry and paints one page into a bitmap of
//! an exact pixel size. [`PdfiumEngine`] is the production implementation on
//! top of `pdfium-render`; tests substitute an in-memory engine.
//!
//! ## Threading
//!
//! pdfium keeps internal per-document state and must not render two pages
//! of the same document at once. Nothing here is `Send`: the async entry
//! points construct the engine *inside* `tokio::task::spawn_blocking` and
//! drive it from that single thread.

use crate::error::PdfImgError;
use crate::geometry::PageSize;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// A PDF parsing/rendering engine.
pub trait RasterEngine {
    /// Parse `data` into a document.
    ///
    /// Fails with [`PdfImgError::Load`] (or a password error) when the
    /// buffer cannot be parsed; no partial document is ever returned.
    fn open<'a>(
        &'a self,
        data: Vec<u8>,
        password: Option<&str>,
    ) -> Result<Box<dyn PageSource + 'a>, PdfImgError>;
}

/// An opened document, addressed by 0-based page index.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Nominal page size in points, with the page's own rotation applied.
    fn page_size(&self, index: usize) -> Result<PageSize, String>;

    /// Paint page `index` into a `width × height` pixel bitmap.
    fn render(&self, index: usize, width: u32, height: u32) -> Result<DynamicImage, String>;
}

/// pdfium-backed engine.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind to the pdfium shared library.
    ///
    /// Lookup order: `PDFIUM_LIB_PATH`, the working directory, then the
    /// system library path.
    pub fn bind() -> Result<Self, PdfImgError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => {
                debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
                Pdfium::bind_to_library(&path)
            }
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| PdfImgError::EngineBinding(e.to_string()))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl RasterEngine for PdfiumEngine {
    fn open<'a>(
        &'a self,
        data: Vec<u8>,
        password: Option<&str>,
    ) -> Result<Box<dyn PageSource + 'a>, PdfImgError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(data, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        PdfImgError::WrongPassword
                    } else {
                        PdfImgError::PasswordRequired
                    }
                } else {
                    PdfImgError::Load { detail: err_str }
                }
            })?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Box::new(PdfiumSource { document }))
    }
}

struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumSource<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, String> {
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| format!("{:?}", e))
    }
}

impl PageSource for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, String> {
        let page = self.page(index)?;
        Ok(PageSize::new(page.width().value, page.height().value))
    }

    fn render(&self, index: usize, width: u32, height: u32) -> Result<DynamicImage, String> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("{:?}", e))?;

        Ok(bitmap.as_image())
    }
}
