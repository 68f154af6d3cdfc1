//! Progress reporting for both pipelines.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::RasterConfigBuilder::progress_callback`] or
//! [`crate::config::ComposeConfigBuilder::progress_callback`] to receive
//! events as each page (or each source image) is processed.
//!
//! Work is strictly sequential, so events for one run arrive in order:
//! `start`, then `page_start` / `page_complete | page_error` per item, then
//! `complete`. The trait is still `Send + Sync` because the async entry
//! points run the pipeline on a blocking worker thread.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfimg::{ConversionProgressCallback, RasterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total: usize, bytes: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {page_num} ({bytes} bytes), {done}/{total}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//! let config = RasterConfig::builder()
//!     .progress_callback(cb as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Called by the pipelines as they process each item.
///
/// For PDF → JPEG an item is a page; for image → PDF it is a source image
/// (numbered 1-based in queue order). All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_conversion_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an item is processed.
    fn on_page_start(&self, page_num: usize, total: usize) {
        let _ = (page_num, total);
    }

    /// Called when an item is done.
    ///
    /// `output_bytes` is the encoded JPEG size for a rendered page and the
    /// source size for a placed image.
    fn on_page_complete(&self, page_num: usize, total: usize, output_bytes: usize) {
        let _ = (page_num, total, output_bytes);
    }

    /// Called when an item fails and the run carries on without it.
    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let _ = (page_num, total, error);
    }

    /// Called once after every item has been attempted.
    fn on_conversion_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the configs.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// A `completed / total` counter.
///
/// `completed` advances after every item, failed or not, so a run always
/// reaches 100 %.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self { completed: 0, total }
    }

    /// Mark one more item as attempted.
    pub fn advance(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    /// Whole-number percentage, rounded half up. An empty run is 100 %.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 200 + self.total) / (self.total * 2)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total: usize, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = Arc::new(TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            started_total: AtomicUsize::new(0),
            completed_total: AtomicUsize::new(0),
        });
        let cb: ProgressCallback = tracker.clone();

        cb.on_conversion_start(3);
        cb.on_page_start(1, 3);
        cb.on_page_complete(1, 3, 100);
        cb.on_page_start(2, 3);
        cb.on_page_error(2, 3, "unsupported shading");
        cb.on_page_start(3, 3);
        cb.on_page_complete(3, 3, 80);
        cb.on_conversion_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn percent_rounds_like_the_progress_bar() {
        let mut p = Progress::new(3);
        assert_eq!(p.percent(), 0);
        p.advance();
        assert_eq!(p.percent(), 33);
        p.advance();
        assert_eq!(p.percent(), 67);
        p.advance();
        assert_eq!(p.percent(), 100);
        assert!(p.is_finished());

        // Never runs past the total.
        p.advance();
        assert_eq!(p.completed, 3);
    }

    #[test]
    fn percent_of_empty_run() {
        assert_eq!(Progress::new(0).percent(), 100);
        let mut half = Progress::new(8);
        (0..4).for_each(|_| half.advance());
        assert_eq!(half.percent(), 50);
    }
}
