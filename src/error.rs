//! Error types for the edgequake-pdfimg library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfImgError`] — **Fatal**: the run cannot proceed at all (unparseable
//!   PDF, no images, an image that cannot be decoded, a PDF that cannot be
//!   finalised). Returned as `Err(PdfImgError)` from the top-level functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page of a PDF failed to render
//!   or encode, but every other page is fine. The rasteriser records it as a
//!   gap in the output and moves on to the next page.
//!
//! Only page-level rendering failures are swallowed (and logged). Nothing is
//! retried automatically; the caller re-initiates a run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfimg library.
#[derive(Debug, Error)]
pub enum PdfImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// No `%PDF-` header near the start of the buffer.
    #[error("Input is not a PDF document (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    // ── PDF → image errors ────────────────────────────────────────────────
    /// The PDF could not be parsed (corrupt header, truncated stream, …).
    ///
    /// Terminal for the run: no partially parsed document is usable.
    #[error("Failed to load PDF: {detail}\nIs the file corrupted?")]
    Load { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Image → PDF errors ────────────────────────────────────────────────
    /// Composition was requested with zero images.
    #[error("No images provided.")]
    EmptyInput,

    /// An image is neither JPEG nor PNG. `index` is the 1-based position
    /// in the input sequence.
    #[error("Image #{index} '{name}' is not a JPEG or PNG file")]
    UnsupportedImageFormat { index: usize, name: String },

    /// An image claimed to be JPEG/PNG but its bytes could not be decoded.
    #[error("Failed to decode image #{index} '{name}': {detail}")]
    ImageDecode {
        index: usize,
        name: String,
        detail: String,
    },

    /// Every image was skipped under [`crate::config::DecodePolicy::Skip`].
    #[error("All {total} images failed to decode.\nFirst error: {first_error}")]
    AllImagesFailed { total: usize, first_error: String },

    /// The authored PDF could not be assembled or serialised.
    #[error("Error generating PDF: {0}")]
    PdfAssembly(String),

    /// A composition was started while another one was still running.
    #[error("A conversion is already in progress")]
    RunInProgress,

    // ── Output errors ─────────────────────────────────────────────────────
    /// Packing rendered pages into a ZIP archive failed.
    #[error("Failed to build image archive: {0}")]
    Archive(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rendering PDF pages needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the binary (current working directory).\n\
  • Install pdfium system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    EngineBinding(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::RasterOutput::failures`] and reported through
/// the progress callback. The run continues with the next page.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The rendering engine failed on this page.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The page rendered but JPEG encoding failed.
    #[error("Page {page}: JPEG encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The page number does not exist in the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    OutOfRange { page: usize, total: usize },
}

impl PageError {
    /// 1-based number of the page that failed.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::EncodeFailed { page, .. }
            | PageError::OutOfRange { page, .. } => *page,
        }
    }
}
