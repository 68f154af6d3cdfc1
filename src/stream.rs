//! Streaming rasterisation: receive pages as they are rendered.
//!
//! Large documents take a while at 2× scale. [`render_stream`] lets callers
//! show or save each page as soon as it exists instead of waiting for the
//! whole document.
//!
//! The engine lives on one `spawn_blocking` thread for the entire run and
//! hands pages over a channel of capacity 1, so at most one finished page
//! waits while the next one renders. Dropping the stream cancels the run:
//! the page being rendered completes, nothing after it is started.

use crate::config::RasterConfig;
use crate::error::{PageError, PdfImgError};
use crate::output::RenderedPage;
use crate::pipeline::render::{PdfiumEngine, RasterEngine};
use crate::rasterize::Rasterizer;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of page results, in increasing page order.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<RenderedPage, PageError>> + Send>>;

/// An opened document and the stream of its selected pages.
pub struct RenderStream {
    /// Pages in the document.
    pub page_count: usize,
    /// Pages the stream will yield (successes plus failures).
    pub total: usize,
    pub pages: PageStream,
}

impl std::fmt::Debug for RenderStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderStream")
            .field("page_count", &self.page_count)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

/// Rasterise PDF bytes with pdfium, streaming pages as they are ready.
///
/// # Returns
/// - `Ok(RenderStream)` once the document has been opened
/// - `Err(PdfImgError)` if pdfium cannot be bound or the PDF cannot be opened
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfimg::{render_stream, RasterConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("document.pdf")?;
/// let mut run = render_stream(bytes, &RasterConfig::default()).await?;
/// while let Some(page) = run.pages.next().await {
///     match page {
///         Ok(p) => println!("{}: {}x{}", p.file_name(), p.width, p.height),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn render_stream(
    bytes: Vec<u8>,
    config: &RasterConfig,
) -> Result<RenderStream, PdfImgError> {
    render_stream_with(PdfiumEngine::bind, bytes, config).await
}

/// [`render_stream`] with a custom engine.
///
/// `factory` runs on the rendering thread, so the engine itself never has
/// to cross threads.
pub async fn render_stream_with<E, F>(
    factory: F,
    bytes: Vec<u8>,
    config: &RasterConfig,
) -> Result<RenderStream, PdfImgError>
where
    E: RasterEngine,
    F: FnOnce() -> Result<E, PdfImgError> + Send + 'static,
{
    let config = config.clone();
    let scale = config.scale;
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(usize, usize), PdfImgError>>();
    let (page_tx, page_rx) = mpsc::channel(1);

    let handle = tokio::task::spawn_blocking(move || {
        let engine = match factory() {
            Ok(engine) => engine,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        let rasterizer = Rasterizer::new(engine, config);
        let doc = match rasterizer.open(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        let mut pages = match doc.pages(scale) {
            Ok(pages) => pages,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        if ready_tx.send(Ok((doc.page_count(), pages.total()))).is_err() {
            return;
        }

        while !page_tx.is_closed() {
            let Some(result) = pages.next() else { break };
            if page_tx.blocking_send(result).is_err() {
                break;
            }
        }
        if !pages.progress().is_finished() {
            debug!(
                "Stream dropped after {}/{} pages",
                pages.progress().completed,
                pages.total()
            );
        }
    });

    let (page_count, total) = match ready_rx.await {
        Ok(opened) => opened?,
        Err(_) => {
            return Err(match handle.await {
                Err(e) => PdfImgError::Internal(format!("render task failed: {e}")),
                Ok(()) => PdfImgError::Internal("render task ended before opening".into()),
            })
        }
    };
    info!("Streaming {} of {} pages", total, page_count);

    Ok(RenderStream {
        page_count,
        total,
        pages: Box::pin(ReceiverStream::new(page_rx)),
    })
}
