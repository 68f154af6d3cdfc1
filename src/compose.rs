//! JPEG/PNG sequence → one PDF.
//!
//! Every image gets its own page of the configured size, scaled uniformly to
//! fit and centred on both axes. Images are processed strictly in order;
//! the first one lands on the author's initial page, each later one on a
//! fresh page.

use crate::config::{ComposeConfig, DecodePolicy};
use crate::error::PdfImgError;
use crate::geometry::fit_rect;
use crate::output::{ComposedDocument, PlacedImage, SkippedImage};
use crate::pipeline::author::{DocumentAuthor, LopdfAuthor};
use crate::pipeline::decode::{decode_image, DecodeError};
use crate::pipeline::input::SourceImage;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lays out source images onto fixed-size PDF pages.
#[derive(Debug, Clone, Default)]
pub struct ImageComposer {
    config: ComposeConfig,
}

impl ImageComposer {
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Compose `images` into a PDF using the `lopdf` author.
    pub fn compose(&self, images: &[SourceImage]) -> Result<ComposedDocument, PdfImgError> {
        self.compose_with(LopdfAuthor::new(self.config.page_size), images)
    }

    /// Compose `images` with a caller-supplied author.
    ///
    /// `author` must start with exactly one empty page.
    pub fn compose_with<A: DocumentAuthor>(
        &self,
        mut author: A,
        images: &[SourceImage],
    ) -> Result<ComposedDocument, PdfImgError> {
        if images.is_empty() {
            return Err(PdfImgError::EmptyInput);
        }

        let start = Instant::now();
        let total = images.len();
        let page_size = self.config.page_size;
        let cb = self.config.progress_callback.as_ref();
        info!(
            "Composing {} images onto {:.2}x{:.2} pt pages",
            total, page_size.width, page_size.height
        );
        if let Some(cb) = cb {
            cb.on_conversion_start(total);
        }

        let mut placed: Vec<PlacedImage> = Vec::with_capacity(total);
        let mut skipped: Vec<SkippedImage> = Vec::new();

        for (index, image) in images.iter().enumerate() {
            let position = index + 1;
            if let Some(cb) = cb {
                cb.on_page_start(position, total);
            }

            let decoded = match decode_image(&image.data) {
                Ok(decoded) => decoded,
                Err(e) => {
                    let err = decode_failure(position, &image.name, e);
                    if let Some(cb) = cb {
                        cb.on_page_error(position, total, &err.to_string());
                    }
                    match self.config.on_decode_error {
                        DecodePolicy::Abort => return Err(err),
                        DecodePolicy::Skip => {
                            warn!("Skipping: {}", err);
                            skipped.push(SkippedImage {
                                source_index: index,
                                name: image.name.clone(),
                                reason: err.to_string(),
                            });
                            continue;
                        }
                    }
                }
            };

            if !placed.is_empty() {
                author.add_page();
            }
            let rect = fit_rect(
                decoded.width as f32,
                decoded.height as f32,
                page_size.width,
                page_size.height,
            );
            author.place_image(&decoded, rect)?;

            debug!(
                "Image #{} '{}' ({}x{} px) → page {}",
                position,
                image.name,
                decoded.width,
                decoded.height,
                placed.len() + 1
            );
            placed.push(PlacedImage {
                page_num: placed.len() + 1,
                source_index: index,
                name: image.name.clone(),
                pixel_width: decoded.width,
                pixel_height: decoded.height,
                placement: rect,
            });
            if let Some(cb) = cb {
                cb.on_page_complete(position, total, image.size());
            }
        }

        if placed.is_empty() {
            let first_error = skipped
                .first()
                .map(|s| s.reason.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(PdfImgError::AllImagesFailed { total, first_error });
        }

        let data = author.finish()?;
        if let Some(cb) = cb {
            cb.on_conversion_complete(total, placed.len());
        }
        info!(
            "Composed {} pages ({} skipped), {} bytes in {}ms",
            placed.len(),
            skipped.len(),
            data.len(),
            start.elapsed().as_millis()
        );

        Ok(ComposedDocument {
            data,
            page_size,
            pages: placed,
            skipped,
        })
    }
}

fn decode_failure(position: usize, name: &str, err: DecodeError) -> PdfImgError {
    match err {
        DecodeError::UnsupportedFormat => PdfImgError::UnsupportedImageFormat {
            index: position,
            name: name.to_string(),
        },
        DecodeError::Invalid(detail) => PdfImgError::ImageDecode {
            index: position,
            name: name.to_string(),
            detail,
        },
    }
}

/// Compose images on a blocking thread.
pub async fn compose_images(
    images: Vec<SourceImage>,
    config: &ComposeConfig,
) -> Result<ComposedDocument, PdfImgError> {
    let composer = ImageComposer::new(config.clone());
    tokio::task::spawn_blocking(move || composer.compose(&images))
        .await
        .map_err(|e| PdfImgError::Internal(format!("compose task failed: {e}")))?
}
