//! Run state for interactive front ends.
//!
//! A front end selects inputs, lets the user adjust them, then starts a
//! run and watches its progress. [`ComposeSession`] covers the image → PDF
//! side (an editable [`ImageQueue`] plus the run status), [`ConversionRun`]
//! the PDF → JPEG side. Neither is persisted; both are owned by the caller.

use crate::compose::compose_images;
use crate::config::ComposeConfig;
use crate::error::{PageError, PdfImgError};
use crate::output::{ComposedDocument, RenderedPage};
use crate::pipeline::input::SourceImage;
use crate::progress::Progress;
use crate::stream::RenderStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ── Image queue ──────────────────────────────────────────────────────────

/// Ordered, user-editable list of images awaiting composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQueue {
    images: Vec<SourceImage>,
}

impl ImageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: SourceImage) {
        self.images.push(image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[SourceImage] {
        &self.images
    }

    /// Swap the image at `index` with its predecessor. False at the top.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.images.len() {
            return false;
        }
        self.images.swap(index, index - 1);
        true
    }

    /// Swap the image at `index` with its successor. False at the bottom.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.images.len() {
            return false;
        }
        self.images.swap(index, index + 1);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<SourceImage> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

impl FromIterator<SourceImage> for ImageQueue {
    fn from_iter<I: IntoIterator<Item = SourceImage>>(iter: I) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

// ── Image → PDF session ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComposeStatus {
    Idle,
    Composing,
    Done,
    Failed,
}

/// An image queue plus the state of its composition run.
///
/// The queue can only be edited while no run is in flight. Removing the
/// last image returns the session to [`ComposeStatus::Idle`].
#[derive(Debug)]
pub struct ComposeSession {
    queue: ImageQueue,
    status: ComposeStatus,
    config: ComposeConfig,
}

impl ComposeSession {
    pub fn new(config: ComposeConfig) -> Self {
        Self {
            queue: ImageQueue::new(),
            status: ComposeStatus::Idle,
            config,
        }
    }

    pub fn status(&self) -> ComposeStatus {
        self.status
    }

    pub fn queue(&self) -> &ImageQueue {
        &self.queue
    }

    pub fn add(&mut self, image: SourceImage) -> Result<(), PdfImgError> {
        self.edit(|q| q.push(image))
    }

    pub fn move_up(&mut self, index: usize) -> Result<bool, PdfImgError> {
        self.edit(|q| q.move_up(index))
    }

    pub fn move_down(&mut self, index: usize) -> Result<bool, PdfImgError> {
        self.edit(|q| q.move_down(index))
    }

    pub fn remove(&mut self, index: usize) -> Result<Option<SourceImage>, PdfImgError> {
        let removed = self.edit(|q| q.remove(index))?;
        if self.queue.is_empty() {
            self.reset();
        }
        Ok(removed)
    }

    /// Drop every image and return to idle.
    pub fn reset(&mut self) {
        debug!("Compose session reset");
        self.queue.clear();
        self.status = ComposeStatus::Idle;
    }

    /// Start a run: snapshot the queue and mark the session busy.
    pub fn begin(&mut self) -> Result<Vec<SourceImage>, PdfImgError> {
        if self.status == ComposeStatus::Composing {
            return Err(PdfImgError::RunInProgress);
        }
        if self.queue.is_empty() {
            return Err(PdfImgError::EmptyInput);
        }
        self.status = ComposeStatus::Composing;
        Ok(self.queue.images().to_vec())
    }

    /// Record the outcome of the run started by [`begin`](Self::begin).
    pub fn complete(
        &mut self,
        result: Result<ComposedDocument, PdfImgError>,
    ) -> Result<ComposedDocument, PdfImgError> {
        self.status = match &result {
            Ok(_) => ComposeStatus::Done,
            Err(e) => {
                warn!("Composition failed: {}", e);
                ComposeStatus::Failed
            }
        };
        result
    }

    /// Compose the current queue.
    pub async fn compose(&mut self) -> Result<ComposedDocument, PdfImgError> {
        let images = self.begin()?;
        let result = compose_images(images, &self.config).await;
        self.complete(result)
    }

    fn edit<T>(&mut self, f: impl FnOnce(&mut ImageQueue) -> T) -> Result<T, PdfImgError> {
        if self.status == ComposeStatus::Composing {
            return Err(PdfImgError::RunInProgress);
        }
        let out = f(&mut self.queue);
        // Any edit invalidates the previous result.
        self.status = ComposeStatus::Idle;
        Ok(out)
    }
}

// ── PDF → JPEG run ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// The document is being opened.
    Loading,
    /// Opened; nothing rendered yet.
    Ready,
    Converting,
    Done,
    /// The document could not be opened.
    Failed,
}

/// Progress of one PDF → JPEG run, fed page by page.
#[derive(Debug)]
pub struct ConversionRun {
    status: RunStatus,
    page_count: usize,
    progress: Progress,
    pages: Vec<RenderedPage>,
    failures: Vec<PageError>,
    error: Option<String>,
}

impl Default for ConversionRun {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionRun {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Loading,
            page_count: 0,
            progress: Progress::default(),
            pages: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn percent(&self) -> u8 {
        self.progress.percent()
    }

    pub fn pages(&self) -> &[RenderedPage] {
        &self.pages
    }

    pub fn failures(&self) -> &[PageError] {
        &self.failures
    }

    /// Why the document could not be opened, once [`RunStatus::Failed`].
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_pages(self) -> Vec<RenderedPage> {
        self.pages
    }

    /// The document opened with `page_count` pages, `selected` to render.
    pub fn loaded(&mut self, page_count: usize, selected: usize) {
        self.status = RunStatus::Ready;
        self.page_count = page_count;
        self.progress = Progress::new(selected);
    }

    pub fn fail(&mut self, err: &PdfImgError) {
        self.status = RunStatus::Failed;
        self.error = Some(err.to_string());
    }

    /// Begin converting. Earlier results are discarded.
    pub fn start(&mut self) -> Result<(), PdfImgError> {
        match self.status {
            RunStatus::Converting => return Err(PdfImgError::RunInProgress),
            RunStatus::Loading | RunStatus::Failed => {
                return Err(PdfImgError::Internal("no document loaded".into()))
            }
            RunStatus::Ready | RunStatus::Done => {}
        }
        self.pages.clear();
        self.failures.clear();
        self.progress = Progress::new(self.progress.total);
        self.status = if self.progress.is_finished() {
            RunStatus::Done
        } else {
            RunStatus::Converting
        };
        Ok(())
    }

    /// Account for one attempted page, successful or not.
    pub fn record(&mut self, result: Result<RenderedPage, PageError>) {
        match result {
            Ok(page) => self.pages.push(page),
            Err(e) => self.failures.push(e),
        }
        self.progress.advance();
        if self.progress.is_finished() {
            self.status = RunStatus::Done;
        }
    }

    /// Follow a [`RenderStream`] from opening to the last page.
    pub async fn drive(
        &mut self,
        opened: Result<RenderStream, PdfImgError>,
    ) -> Result<(), PdfImgError> {
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        self.loaded(stream.page_count, stream.total);
        self.start()?;
        while let Some(result) = stream.pages.next().await {
            self.record(result);
        }
        Ok(())
    }
}
