//! # edgequake-pdfimg
//!
//! Convert between PDF documents and page images, in both directions.
//!
//! * **PDF → JPEG**: every page is rasterised with pdfium at 2× its nominal
//!   size and encoded as a quality-95 JPEG named `page_<n>.jpg`. Pages can
//!   be collected eagerly, iterated, or streamed, and bundled into a ZIP.
//! * **JPEG/PNG → PDF**: an ordered list of images becomes one PDF with one
//!   image per page, each scaled to fit an A4 page (by default) and centred.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes ──▶ open (pdfium) ──▶ render page 1..N ──▶ JPEG ──▶ files / ZIP
//!
//! images ──▶ decode ──▶ fit_rect on page ──▶ lopdf ──▶ one PDF
//! ```
//!
//! A page that fails to render is reported and skipped; the rest of the
//! document still converts. Everything else is fatal and returned as
//! [`PdfImgError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfimg::{compose_images, convert_pdf, ComposeConfig, RasterConfig, SourceImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pdf = std::fs::read("document.pdf")?;
//!     let output = convert_pdf(pdf, &RasterConfig::default()).await?;
//!     eprintln!("{} pages, {} failed", output.pages.len(), output.failures.len());
//!
//!     let images = vec![SourceImage::from_path("scan-1.jpg").await?];
//!     let doc = compose_images(images, &ComposeConfig::default()).await?;
//!     std::fs::write("converted_images.pdf", &doc.data)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfimg` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfimg = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rasterising needs the pdfium shared library at runtime. It is looked up
//! via `PDFIUM_LIB_PATH`, then the working directory, then the system
//! library path. Composing PDFs does not need pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod compose;
pub mod config;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod rasterize;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{build_archive, ARCHIVE_FOLDER};
pub use compose::{compose_images, ImageComposer};
pub use config::{
    ComposeConfig, ComposeConfigBuilder, DecodePolicy, PageSelection, RasterConfig,
    RasterConfigBuilder,
};
pub use convert::{
    convert_pdf, convert_pdf_with, images_to_pdf_file, inspect, inspect_with, write_archive,
    write_atomic, write_pages,
};
pub use error::{PageError, PdfImgError};
pub use geometry::{fit_rect, scaled_dimensions, PageSize, Rect};
pub use output::{
    ComposedDocument, DocumentInfo, PlacedImage, RasterOutput, RasterStats, RenderedPage,
    SkippedImage, DEFAULT_PDF_NAME,
};
pub use pipeline::author::{DocumentAuthor, LopdfAuthor};
pub use pipeline::input::{archive_name_for, SourceImage};
pub use pipeline::render::{PageSource, PdfiumEngine, RasterEngine};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, Progress, ProgressCallback};
pub use rasterize::{Rasterizer, RenderPages, SourceDocument};
pub use session::{ComposeSession, ComposeStatus, ConversionRun, ImageQueue, RunStatus};
pub use stream::{render_stream, render_stream_with, PageStream, RenderStream};
