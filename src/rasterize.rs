//! PDF → JPEG pages, synchronously.
//!
//! [`Rasterizer`] owns an engine and a [`RasterConfig`]; [`Rasterizer::open`]
//! parses a buffer into a [`SourceDocument`] which then renders pages one at
//! a time, in increasing page order. A page that fails is reported as a
//! [`PageError`] and the run moves on; only opening the document is fatal.
//!
//! Everything here blocks. The async wrappers in [`crate::stream`] and
//! [`crate::convert`] run it on a `spawn_blocking` thread.

use crate::config::RasterConfig;
use crate::error::{PageError, PdfImgError};
use crate::geometry::{scaled_dimensions, PageSize};
use crate::output::{RasterOutput, RasterStats, RenderedPage, JPEG_MIME};
use crate::pipeline::encode::encode_jpeg;
use crate::pipeline::input::validate_pdf_bytes;
use crate::pipeline::render::{PageSource, PdfiumEngine, RasterEngine};
use crate::progress::{Progress, ProgressCallback};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A rendering engine paired with the settings for a run.
pub struct Rasterizer<E> {
    engine: E,
    config: RasterConfig,
}

impl Rasterizer<PdfiumEngine> {
    /// Rasterizer on the system pdfium library.
    pub fn with_pdfium(config: RasterConfig) -> Result<Self, PdfImgError> {
        Ok(Self::new(PdfiumEngine::bind()?, config))
    }
}

impl<E: RasterEngine> Rasterizer<E> {
    pub fn new(engine: E, config: RasterConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Parse `data` into a document.
    ///
    /// Buffers with no `%PDF-` header in their first KiB are rejected
    /// before the engine sees them. Any parse failure is terminal for the run.
    pub fn open(&self, data: Vec<u8>) -> Result<SourceDocument<'_>, PdfImgError> {
        validate_pdf_bytes(&data)?;
        let size = data.len();
        let source = self.engine.open(data, self.config.password.as_deref())?;
        let page_count = source.page_count();
        info!("Opened PDF ({} bytes): {} pages", size, page_count);

        Ok(SourceDocument {
            source,
            page_count,
            config: &self.config,
        })
    }
}

/// A parsed PDF, valid for the lifetime of its [`Rasterizer`].
pub struct SourceDocument<'a> {
    source: Box<dyn PageSource + 'a>,
    page_count: usize,
    config: &'a RasterConfig,
}

impl<'a> SourceDocument<'a> {
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Nominal size in points of 1-based page `page_num`.
    pub fn page_size(&self, page_num: usize) -> Result<PageSize, PageError> {
        self.check_page(page_num)?;
        self.source
            .page_size(page_num - 1)
            .map_err(|detail| PageError::RenderFailed {
                page: page_num,
                detail,
            })
    }

    /// Nominal sizes of every page, page 1 first.
    pub fn page_sizes(&self) -> Result<Vec<PageSize>, PdfImgError> {
        (1..=self.page_count)
            .map(|n| self.page_size(n).map_err(|e| PdfImgError::Load { detail: e.to_string() }))
            .collect()
    }

    /// Pages selected by the config, 1-based and increasing.
    ///
    /// An explicit selection that matches nothing is an error; an empty
    /// document simply yields no pages.
    pub fn selected_pages(&self) -> Result<Vec<usize>, PdfImgError> {
        let pages = self.config.pages.to_page_numbers(self.page_count);
        if pages.is_empty() && self.page_count > 0 {
            return Err(PdfImgError::PageOutOfRange {
                page: self.config.pages.first_requested(),
                total: self.page_count,
            });
        }
        Ok(pages)
    }

    /// Render one page at `scale` and encode it as JPEG.
    ///
    /// The bitmap is `round(points × scale)` pixels on each axis.
    pub fn render_page(&self, page_num: usize, scale: f32) -> Result<RenderedPage, PageError> {
        let size = self.page_size(page_num)?;
        let (width, height) = scaled_dimensions(size.width, size.height, scale);

        let img = self
            .source
            .render(page_num - 1, width, height)
            .map_err(|detail| PageError::RenderFailed {
                page: page_num,
                detail,
            })?;

        let data = encode_jpeg(&img, self.config.jpeg_quality).map_err(|e| {
            PageError::EncodeFailed {
                page: page_num,
                detail: e.to_string(),
            }
        })?;

        debug!(
            "Page {}: {:.1}x{:.1} pt → {}x{} px, {} bytes",
            page_num,
            size.width,
            size.height,
            img.width(),
            img.height(),
            data.len()
        );

        Ok(RenderedPage {
            page_num,
            width: img.width(),
            height: img.height(),
            data,
            mime_type: JPEG_MIME,
        })
    }

    /// Iterate over the selected pages, rendering each on demand.
    pub fn pages(&self, scale: f32) -> Result<RenderPages<'_, 'a>, PdfImgError> {
        let pages = self.selected_pages()?;
        Ok(RenderPages::new(self, pages, scale))
    }

    /// Render every selected page, handing each one to `on_page` as soon as
    /// it is ready.
    pub fn render_all<F>(&self, scale: f32, mut on_page: F) -> Result<RasterOutput, PdfImgError>
    where
        F: FnMut(&RenderedPage),
    {
        let start = Instant::now();
        let iter = self.pages(scale)?;
        let selected = iter.total();

        let mut pages = Vec::with_capacity(selected);
        let mut failures = Vec::new();
        for result in iter {
            match result {
                Ok(page) => {
                    on_page(&page);
                    pages.push(page);
                }
                Err(e) => failures.push(e),
            }
        }

        let stats = RasterStats {
            total_pages: self.page_count,
            selected_pages: selected,
            rendered_pages: pages.len(),
            failed_pages: failures.len(),
            output_bytes: pages.iter().map(|p| p.data.len()).sum(),
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        Ok(RasterOutput {
            pages,
            failures,
            page_count: self.page_count,
            stats,
        })
    }

    fn check_page(&self, page_num: usize) -> Result<(), PageError> {
        if page_num == 0 || page_num > self.page_count {
            return Err(PageError::OutOfRange {
                page: page_num,
                total: self.page_count,
            });
        }
        Ok(())
    }
}

/// Lazily renders pages of a [`SourceDocument`].
///
/// Fires the configured progress callback as it goes: conversion start on
/// creation, start and complete/error per page, conversion complete once
/// the last page has been attempted.
pub struct RenderPages<'d, 'a> {
    doc: &'d SourceDocument<'a>,
    pages: std::vec::IntoIter<usize>,
    scale: f32,
    progress: Progress,
    successes: usize,
    callback: Option<ProgressCallback>,
    done: bool,
}

impl<'d, 'a> RenderPages<'d, 'a> {
    fn new(doc: &'d SourceDocument<'a>, pages: Vec<usize>, scale: f32) -> Self {
        let total = pages.len();
        let callback = doc.config.progress_callback.clone();
        if let Some(ref cb) = callback {
            cb.on_conversion_start(total);
        }
        info!("Rendering {} pages at scale {}", total, scale);

        Self {
            doc,
            pages: pages.into_iter(),
            scale,
            progress: Progress::new(total),
            successes: 0,
            callback,
            done: false,
        }
    }

    /// Number of pages this iterator will attempt.
    pub fn total(&self) -> usize {
        self.progress.total
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Some(ref cb) = self.callback {
            cb.on_conversion_complete(self.progress.total, self.successes);
        }
        info!("Rendered {}/{} pages", self.successes, self.progress.total);
    }
}

impl Iterator for RenderPages<'_, '_> {
    type Item = Result<RenderedPage, PageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(page_num) = self.pages.next() else {
            self.finish();
            return None;
        };
        let total = self.progress.total;

        if let Some(ref cb) = self.callback {
            cb.on_page_start(page_num, total);
        }

        let result = self.doc.render_page(page_num, self.scale);
        match &result {
            Ok(page) => {
                self.successes += 1;
                if let Some(ref cb) = self.callback {
                    cb.on_page_complete(page_num, total, page.data.len());
                }
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(ref cb) = self.callback {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
            }
        }
        self.progress.advance();

        if self.pages.len() == 0 {
            self.finish();
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pages.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSelection;
    use crate::pipeline::render::fake::{fake_pdf, FakeEngine};
    use crate::progress::ConversionProgressCallback;
    use std::sync::{Arc, Mutex};

    fn small() -> PageSize {
        PageSize::new(100.0, 50.0)
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl ConversionProgressCallback for EventLog {
        fn on_conversion_start(&self, total: usize) {
            self.0.lock().unwrap().push(format!("start {total}"));
        }
        fn on_page_start(&self, page_num: usize, _total: usize) {
            self.0.lock().unwrap().push(format!("page {page_num}"));
        }
        fn on_page_complete(&self, page_num: usize, _total: usize, _bytes: usize) {
            self.0.lock().unwrap().push(format!("ok {page_num}"));
        }
        fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
            self.0.lock().unwrap().push(format!("err {page_num}"));
        }
        fn on_conversion_complete(&self, total: usize, success_count: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("done {success_count}/{total}"));
        }
    }

    #[test]
    fn letter_pages_at_double_scale() {
        let rasterizer = Rasterizer::new(
            FakeEngine::uniform(3, PageSize::LETTER),
            RasterConfig::default(),
        );
        let doc = rasterizer.open(fake_pdf()).unwrap();
        assert_eq!(doc.page_count(), 3);

        let mut seen = Vec::new();
        let output = doc.render_all(2.0, |p| seen.push(p.page_num)).unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(output.pages.len(), 3);
        for page in &output.pages {
            assert_eq!((page.width, page.height), (1224, 1584));
            assert_eq!(page.mime_type, "image/jpeg");
            assert!(page.data.starts_with(&[0xFF, 0xD8]));
        }
        assert!(output.failures.is_empty());
        assert_eq!(output.stats.rendered_pages, 3);
    }

    #[test]
    fn failed_page_leaves_a_gap() {
        let engine = FakeEngine::uniform(4, small()).failing_on(2);
        let rasterizer = Rasterizer::new(engine, RasterConfig::default());
        let doc = rasterizer.open(fake_pdf()).unwrap();

        let output = doc.render_all(1.0, |_| {}).unwrap();
        let nums: Vec<usize> = output.pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![1, 3, 4]);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].page(), 2);
        assert!(matches!(output.failures[0], PageError::RenderFailed { .. }));
        assert_eq!(output.stats.failed_pages, 1);
        assert_eq!(output.stats.selected_pages, 4);
    }

    #[test]
    fn iterator_tracks_progress_through_failures() {
        let engine = FakeEngine::uniform(3, small()).failing_on(3);
        let log = Arc::new(EventLog::default());
        let config = RasterConfig::builder()
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let rasterizer = Rasterizer::new(engine, config);
        let doc = rasterizer.open(fake_pdf()).unwrap();

        let mut pages = doc.pages(1.0).unwrap();
        assert_eq!(pages.progress().percent(), 0);
        assert!(pages.next().unwrap().is_ok());
        assert_eq!(pages.progress().percent(), 33);
        assert!(pages.next().unwrap().is_ok());
        assert!(pages.next().unwrap().is_err());
        assert!(pages.progress().is_finished());
        assert!(pages.next().is_none());

        let events = log.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start 3", "page 1", "ok 1", "page 2", "ok 2", "page 3", "err 3", "done 2/3"]
        );
    }

    #[test]
    fn selection_limits_pages() {
        let config = RasterConfig::builder()
            .pages(PageSelection::Set(vec![4, 2, 9]))
            .build()
            .unwrap();
        let rasterizer = Rasterizer::new(FakeEngine::uniform(5, small()), config);
        let doc = rasterizer.open(fake_pdf()).unwrap();
        let output = doc.render_all(1.0, |_| {}).unwrap();
        let nums: Vec<usize> = output.pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![2, 4]);
        assert_eq!(output.page_count, 5);
    }

    #[test]
    fn selection_outside_document_is_fatal() {
        let config = RasterConfig::builder()
            .pages(PageSelection::Single(7))
            .build()
            .unwrap();
        let rasterizer = Rasterizer::new(FakeEngine::uniform(2, small()), config);
        let doc = rasterizer.open(fake_pdf()).unwrap();
        assert!(matches!(
            doc.render_all(1.0, |_| {}),
            Err(PdfImgError::PageOutOfRange { page: 7, total: 2 })
        ));
    }

    #[test]
    fn empty_selection_reports_first_requested_page() {
        let config = RasterConfig::builder()
            .pages(PageSelection::Range(8, 10))
            .build()
            .unwrap();
        let rasterizer = Rasterizer::new(FakeEngine::uniform(5, small()), config);
        let doc = rasterizer.open(fake_pdf()).unwrap();
        let err = doc.selected_pages().unwrap_err();
        assert!(matches!(err, PdfImgError::PageOutOfRange { page: 8, total: 5 }));
        assert!(err.to_string().contains('8'), "{err}");
    }

    #[test]
    fn render_page_out_of_range() {
        let rasterizer = Rasterizer::new(FakeEngine::uniform(1, small()), RasterConfig::default());
        let doc = rasterizer.open(fake_pdf()).unwrap();
        assert_eq!(
            doc.render_page(0, 1.0).unwrap_err(),
            PageError::OutOfRange { page: 0, total: 1 }
        );
        assert_eq!(
            doc.render_page(2, 1.0).unwrap_err(),
            PageError::OutOfRange { page: 2, total: 1 }
        );
    }

    #[test]
    fn mixed_page_sizes_scale_independently() {
        let engine = FakeEngine::with_pages(vec![PageSize::new(10.0, 20.0), PageSize::new(33.3, 10.0)]);
        let rasterizer = Rasterizer::new(engine, RasterConfig::default());
        let doc = rasterizer.open(fake_pdf()).unwrap();

        let first = doc.render_page(1, 1.5).unwrap();
        assert_eq!((first.width, first.height), (15, 30));
        let second = doc.render_page(2, 1.5).unwrap();
        // 49.95 rounds to 50
        assert_eq!((second.width, second.height), (50, 15));
        assert_eq!(doc.page_sizes().unwrap().len(), 2);
    }

    #[test]
    fn corrupt_and_foreign_buffers() {
        let rasterizer = Rasterizer::new(FakeEngine::uniform(1, small()), RasterConfig::default());
        let truncated = b"%PDF-1.7\n1 0 obj".to_vec();
        assert!(matches!(
            rasterizer.open(truncated),
            Err(PdfImgError::Load { .. })
        ));
        assert!(matches!(
            rasterizer.open(b"PK\x03\x04zip".to_vec()),
            Err(PdfImgError::NotAPdf { .. })
        ));
    }

    #[test]
    fn leading_bytes_before_header_still_open() {
        let rasterizer = Rasterizer::new(FakeEngine::uniform(2, small()), RasterConfig::default());
        let mut prefixed = b"\r\n".to_vec();
        prefixed.extend(fake_pdf());

        let doc = rasterizer.open(prefixed).unwrap();
        assert_eq!(doc.page_count(), 2);
        let output = doc.render_all(1.0, |_| {}).unwrap();
        assert_eq!(output.pages.len(), 2);
    }

    #[test]
    fn password_is_forwarded_to_engine() {
        let engine = FakeEngine::uniform(1, small()).with_password("s3cret");

        let no_pwd = Rasterizer::new(engine.clone(), RasterConfig::default());
        assert!(matches!(
            no_pwd.open(fake_pdf()),
            Err(PdfImgError::PasswordRequired)
        ));

        let wrong = Rasterizer::new(
            engine.clone(),
            RasterConfig::builder().password("nope").build().unwrap(),
        );
        assert!(matches!(wrong.open(fake_pdf()), Err(PdfImgError::WrongPassword)));

        let right = Rasterizer::new(
            engine,
            RasterConfig::builder().password("s3cret").build().unwrap(),
        );
        assert_eq!(right.open(fake_pdf()).unwrap().page_count(), 1);
    }

    #[test]
    fn empty_document_renders_nothing() {
        let rasterizer = Rasterizer::new(FakeEngine::default(), RasterConfig::default());
        let doc = rasterizer.open(fake_pdf()).unwrap();
        let output = doc.render_all(2.0, |_| {}).unwrap();
        assert!(output.pages.is_empty());
        assert_eq!(output.stats.total_pages, 0);
    }
}
