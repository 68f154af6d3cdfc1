//! Configuration types for both conversion directions.
//!
//! PDF → JPEG runs are controlled through [`RasterConfig`], JPEG/PNG → PDF
//! runs through [`ComposeConfig`]. Both are built via a builder that clamps
//! or validates every knob, so an invalid value never reaches the engines.
//!
//! The defaults reproduce the reference behaviour exactly: pages rendered at
//! 2× their nominal size and encoded at JPEG quality 95; images fitted onto
//! A4 portrait pages, aborting on the first image that cannot be decoded.

use crate::error::PdfImgError;
use crate::geometry::PageSize;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default render scale: roughly 2× native resolution.
pub const DEFAULT_SCALE: f32 = 2.0;

/// Default JPEG quality (0.95 on a 0–1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

const SCALE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=10.0;

// ── PDF → JPEG ───────────────────────────────────────────────────────────

/// Configuration for rasterising a PDF into JPEG pages.
///
/// # Example
/// ```rust
/// use edgequake_pdfimg::{PageSelection, RasterConfig};
///
/// let config = RasterConfig::builder()
///     .scale(3.0)
///     .jpeg_quality(90)
///     .pages(PageSelection::Range(1, 5))
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 90);
/// ```
#[derive(Clone)]
pub struct RasterConfig {
    /// Multiplier applied to each page's nominal size in points. Default: 2.0.
    ///
    /// A 612 × 792 pt Letter page at 2.0 becomes a 1224 × 1584 px JPEG.
    /// Memory use grows with the square of the scale.
    pub scale: f32,

    /// JPEG quality, 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// User password for encrypted documents.
    pub password: Option<String>,

    /// Which pages to render. Default: all, in document order.
    pub pages: PageSelection,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            password: None,
            pages: PageSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RasterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterConfig")
            .field("scale", &self.scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl RasterConfig {
    /// Create a builder initialised with defaults.
    pub fn builder() -> RasterConfigBuilder {
        RasterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RasterConfig`].
#[derive(Debug)]
pub struct RasterConfigBuilder {
    config: RasterConfig,
}

impl RasterConfigBuilder {
    /// Render scale (validated in [`build`](Self::build), 0.1–10).
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    /// JPEG quality (clamped to 1–100).
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<RasterConfig, PdfImgError> {
        let scale = self.config.scale;
        if !scale.is_finite() || !SCALE_RANGE.contains(&scale) {
            return Err(PdfImgError::InvalidConfig(format!(
                "Scale must be {}–{}, got {}",
                SCALE_RANGE.start(),
                SCALE_RANGE.end(),
                scale
            )));
        }
        Ok(self.config)
    }
}

/// Specifies which pages of the PDF to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Render all pages (default).
    #[default]
    All,
    /// Render a single page (1-indexed).
    Single(usize),
    /// Render a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Render specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-indexed
    /// page numbers that exist in a document of `total_pages` pages.
    pub fn to_page_numbers(&self, total_pages: usize) -> Vec<usize> {
        let mut pages: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => {
                if (1..=total_pages).contains(p) {
                    vec![*p]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => ((*start).max(1)..=(*end).min(total_pages)).collect(),
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|p| (1..=total_pages).contains(p))
                .collect(),
        };
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// The lowest page number the selection asks for, whether or not the
    /// document has it.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
        }
    }
}

// ── JPEG/PNG → PDF ───────────────────────────────────────────────────────

/// What to do when one source image cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodePolicy {
    /// Abort the whole composition on the first bad image (default).
    #[default]
    Abort,
    /// Leave the bad image out, record it, and carry on with the rest.
    Skip,
}

/// Configuration for composing images into one PDF.
///
/// # Example
/// ```rust
/// use edgequake_pdfimg::{ComposeConfig, DecodePolicy, PageSize};
///
/// let config = ComposeConfig::builder()
///     .page_size(PageSize::LETTER.landscape())
///     .on_decode_error(DecodePolicy::Skip)
///     .build()
///     .unwrap();
/// assert_eq!(config.page_size.width, 792.0);
/// ```
#[derive(Clone, Default)]
pub struct ComposeConfig {
    /// Size of every output page. Default: A4 portrait.
    ///
    /// Pages are never sized to the image; each image is fitted and centred.
    pub page_size: PageSize,

    /// Bad-image policy. Default: [`DecodePolicy::Abort`].
    pub on_decode_error: DecodePolicy,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ComposeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeConfig")
            .field("page_size", &self.page_size)
            .field("on_decode_error", &self.on_decode_error)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ComposeConfig {
    /// Create a builder initialised with defaults.
    pub fn builder() -> ComposeConfigBuilder {
        ComposeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ComposeConfig`].
#[derive(Debug)]
pub struct ComposeConfigBuilder {
    config: ComposeConfig,
}

impl ComposeConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn on_decode_error(mut self, policy: DecodePolicy) -> Self {
        self.config.on_decode_error = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<ComposeConfig, PdfImgError> {
        let size = self.config.page_size;
        if !size.is_valid() {
            return Err(PdfImgError::InvalidConfig(format!(
                "Page size must be positive, got {} × {} pt",
                size.width, size.height
            )));
        }
        Ok(self.config)
    }
}
