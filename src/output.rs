//! Result types produced by the two pipelines.

use crate::error::PageError;
use crate::geometry::{PageSize, Rect};
use serde::{Deserialize, Serialize};

/// MIME type of every rendered page.
pub const JPEG_MIME: &str = "image/jpeg";

/// Default file name for a composed PDF.
pub const DEFAULT_PDF_NAME: &str = "converted_images.pdf";

/// One PDF page rasterised and JPEG-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 1-based page number in the source document.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// Encoded JPEG bytes.
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl RenderedPage {
    /// Conventional download name, `page_<n>.jpg`.
    pub fn file_name(&self) -> String {
        format!("page_{}.jpg", self.page_num)
    }
}

// JPEG payloads are large; keep them out of debug output.
impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page_num", &self.page_num)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Everything a PDF → JPEG run produced.
#[derive(Debug, Clone)]
pub struct RasterOutput {
    /// Successfully rendered pages, in increasing page order.
    pub pages: Vec<RenderedPage>,
    /// Pages that failed; each one is a gap in `pages`.
    pub failures: Vec<PageError>,
    /// Pages in the source document, selected or not.
    pub page_count: usize,
    pub stats: RasterStats,
}

/// Summary counters for a PDF → JPEG run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages selected for rendering.
    pub selected_pages: usize,
    pub rendered_pages: usize,
    pub failed_pages: usize,
    /// Sum of all JPEG sizes.
    pub output_bytes: usize,
    pub total_duration_ms: u64,
}

/// Page count and per-page nominal sizes of a PDF, without rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Nominal size of each page in points, index 0 = page 1.
    pub page_sizes: Vec<PageSize>,
}

/// One source image as placed on its output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedImage {
    /// 1-based output page number.
    pub page_num: usize,
    /// Position of the image in the input sequence (0-based).
    pub source_index: usize,
    pub name: String,
    /// Native pixel size of the source image.
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Fitted position and size on the page, in points from the top-left.
    pub placement: Rect,
}

/// A source image left out under [`crate::config::DecodePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedImage {
    pub source_index: usize,
    pub name: String,
    pub reason: String,
}

/// The single PDF produced by an image → PDF run.
#[derive(Clone)]
pub struct ComposedDocument {
    /// Serialised PDF.
    pub data: Vec<u8>,
    pub page_size: PageSize,
    /// One entry per output page, in page order.
    pub pages: Vec<PlacedImage>,
    pub skipped: Vec<SkippedImage>,
}

impl ComposedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl std::fmt::Debug for ComposedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedDocument")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("page_size", &self.page_size)
            .field("pages", &self.pages)
            .field("skipped", &self.skipped)
            .finish()
    }
}
