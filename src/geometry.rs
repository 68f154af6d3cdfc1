//! Fit/scale math shared by both pipelines.
//!
//! All lengths are PDF points (1/72 inch) unless a name says pixels.
//! The composer uses [`fit_rect`] to centre each image on its page; the
//! rasteriser uses [`scaled_dimensions`] to size the pixel surface for a page.

use serde::{Deserialize, Serialize};

/// A page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO A4 portrait, 210 × 297 mm.
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    /// US Letter portrait, 8.5 × 11 in.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The same page turned on its side (width and height swapped).
    pub fn landscape(self) -> Self {
        if self.width >= self.height {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }

    /// True when both sides are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// An axis-aligned rectangle. `x`/`y` measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `content` uniformly to the largest size that fits inside `bound`,
/// then centre it on both axes.
///
/// Small content is scaled *up*: a 100 × 100 image on an A4 page fills the
/// page width. Callers must pass strictly positive sizes.
pub fn fit_rect(content_w: f32, content_h: f32, bound_w: f32, bound_h: f32) -> Rect {
    let ratio = (bound_w / content_w).min(bound_h / content_h);
    let width = content_w * ratio;
    let height = content_h * ratio;

    Rect {
        x: (bound_w - width) / 2.0,
        y: (bound_h - height) / 2.0,
        width,
        height,
    }
}

/// Pixel size of a page of `width_pts × height_pts` rendered at `scale`.
///
/// Rounds to the nearest pixel and never returns a zero-sized surface.
pub fn scaled_dimensions(width_pts: f32, height_pts: f32, scale: f32) -> (u32, u32) {
    let px = |pts: f32| ((pts * scale).round() as u32).max(1);
    (px(width_pts), px(height_pts))
}
