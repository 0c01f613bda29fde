//! Page Render Controller.
//!
//! Keeps the display surface an accurate picture of (document, page, scale)
//! and keeps the annotation surface sized to match.
//!
//! Rendering is split in three so overlapping requests are safe:
//! [`PageRenderController::begin_render`] snapshots the view under a fresh
//! sequence number, [`RenderJob::run`] paints into an off-screen surface, and
//! [`PageRenderController::commit`] swaps it in only if no newer request was
//! issued in the meantime. A failed or stale job never touches the live
//! surfaces.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::annotations::AnnotationOverlay;
use crate::config::ZoomConfig;
use crate::pdf::{LoadError, Rasterizer, RenderError};
use crate::viewer::DisplaySurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Empty,
    Loading,
    Ready,
}

/// Current page (1-based) and zoom scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub current_page: u32,
    pub scale: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { current_page: 1, scale: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub page_count: u32,
    pub current_page: u32,
    pub scale: f64,
}

/// What the live surfaces currently show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderedFrame {
    pub sequence: u64,
    pub page_number: u32,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

/// Snapshot of a render request, independent of the controller borrow.
#[derive(Debug, Clone)]
pub struct RenderJob<D> {
    sequence: u64,
    document: D,
    page_number: u32,
    scale: f64,
}

/// A page painted off-screen, waiting to be committed.
#[derive(Debug, Clone)]
pub struct PaintedFrame {
    sequence: u64,
    page_number: u32,
    scale: f64,
    surface: DisplaySurface,
}

impl PaintedFrame {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommitOutcome {
    Applied(RenderedFrame),
    Stale { sequence: u64, latest: u64 },
}

impl<D> RenderJob<D> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Resolve the page, size a fresh surface to the viewport and paint it.
    pub async fn run<R>(self, rasterizer: &R) -> Result<PaintedFrame, RenderError>
    where
        R: Rasterizer<Document = D>,
    {
        let page = rasterizer.get_page(&self.document, self.page_number).await?;
        let viewport = rasterizer.viewport(&page, self.scale);
        let (width, height) = viewport.checked_surface_size()?;

        let mut surface = DisplaySurface::new(width, height);
        rasterizer.render(&page, viewport, &mut surface).await?;

        Ok(PaintedFrame {
            sequence: self.sequence,
            page_number: self.page_number,
            scale: self.scale,
            surface,
        })
    }
}

pub struct PageRenderController<R: Rasterizer> {
    rasterizer: Arc<R>,
    zoom: ZoomConfig,
    state: ControllerState,
    document: Option<R::Document>,
    view: ViewState,
    display: DisplaySurface,
    overlay: AnnotationOverlay,
    latest_request: u64,
    last_frame: Option<RenderedFrame>,
}

impl<R: Rasterizer> PageRenderController<R> {
    pub fn new(rasterizer: R, zoom: ZoomConfig) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            zoom,
            state: ControllerState::Empty,
            document: None,
            view: ViewState { current_page: 1, scale: zoom.clamp(1.0) },
            display: DisplaySurface::default(),
            overlay: AnnotationOverlay::default(),
            latest_request: 0,
            last_frame: None,
        }
    }

    pub fn rasterizer(&self) -> Arc<R> {
        Arc::clone(&self.rasterizer)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Pages in the current document, 0 when nothing is loaded.
    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |doc| self.rasterizer.page_count(doc))
    }

    pub fn display(&self) -> &DisplaySurface {
        &self.display
    }

    pub fn overlay(&self) -> &AnnotationOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut AnnotationOverlay {
        &mut self.overlay
    }

    pub fn last_frame(&self) -> Option<RenderedFrame> {
        self.last_frame
    }

    pub fn summary(&self) -> Option<DocumentSummary> {
        self.document.as_ref()?;
        Some(DocumentSummary {
            page_count: self.page_count(),
            current_page: self.view.current_page,
            scale: self.view.scale,
        })
    }

    /// Decode `bytes` and make it the current document. On failure the
    /// previous document (if any) stays current and renderable.
    pub async fn load_document(
        &mut self,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<DocumentSummary, LoadError> {
        let bytes = bytes.into();
        debug!(len = bytes.len(), from = ?self.state, "loading document");
        self.state = ControllerState::Loading;

        match self.rasterizer.load(bytes).await {
            Ok(document) => {
                let page_count = self.rasterizer.page_count(&document);
                self.document = Some(document);
                self.view = ViewState { current_page: 1, scale: self.home_scale() };
                // Frames requested for the old document must never land.
                self.latest_request += 1;
                self.state = ControllerState::Ready;
                info!(page_count, "document loaded");
                Ok(DocumentSummary { page_count, current_page: 1, scale: self.view.scale })
            }
            Err(e) => {
                self.state = if self.document.is_some() {
                    ControllerState::Ready
                } else {
                    ControllerState::Empty
                };
                warn!(error = %e, state = ?self.state, "document load failed");
                Err(e)
            }
        }
    }

    /// Jump to page `n`, clamped to the document. Returns whether the page
    /// changed; always `false` with no document.
    pub fn set_page(&mut self, n: u32) -> bool {
        if self.document.is_none() {
            return false;
        }
        let target = n.clamp(1, self.page_count().max(1));
        let changed = target != self.view.current_page;
        self.view.current_page = target;
        changed
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.view.current_page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.view.current_page.saturating_sub(1))
    }

    pub fn can_go_prev(&self) -> bool {
        self.is_loaded() && self.view.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.is_loaded() && self.view.current_page < self.page_count()
    }

    /// Set the zoom scale, clamped to the configured range. Non-finite input
    /// is ignored. Returns whether the scale changed.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        if !scale.is_finite() {
            return false;
        }
        self.apply_scale(self.zoom.clamp(scale))
    }

    pub fn zoom_in(&mut self) -> bool {
        let stepped = round_to_hundredths(self.view.scale + self.zoom.step);
        self.apply_scale(stepped.min(self.zoom.max))
    }

    pub fn zoom_out(&mut self) -> bool {
        let stepped = round_to_hundredths(self.view.scale - self.zoom.step);
        self.apply_scale(stepped.max(self.zoom.min))
    }

    pub fn reset_scale(&mut self) -> bool {
        self.apply_scale(self.home_scale())
    }

    /// 100%, or the nearest zoom limit when the configured range excludes it.
    fn home_scale(&self) -> f64 {
        self.zoom.clamp(1.0)
    }

    fn apply_scale(&mut self, scale: f64) -> bool {
        let changed = scale != self.view.scale;
        self.view.scale = scale;
        changed
    }

    /// Issue a render request for the current view. Any request issued
    /// earlier becomes stale.
    pub fn begin_render(&mut self) -> Result<RenderJob<R::Document>, RenderError> {
        let document = self.document.clone().ok_or(RenderError::NoDocument)?;
        self.latest_request += 1;
        Ok(RenderJob {
            sequence: self.latest_request,
            document,
            page_number: self.view.current_page,
            scale: self.view.scale,
        })
    }

    /// Swap a painted frame in, resizing and wiping the annotation surface to
    /// match. Frames from superseded requests are dropped.
    pub fn commit(&mut self, frame: PaintedFrame) -> CommitOutcome {
        if frame.sequence != self.latest_request {
            debug!(sequence = frame.sequence, latest = self.latest_request, "dropping stale frame");
            return CommitOutcome::Stale { sequence: frame.sequence, latest: self.latest_request };
        }

        let (width, height) = frame.surface.dimensions();
        self.overlay.resize_and_clear(width, height);
        self.display = frame.surface;

        let rendered = RenderedFrame {
            sequence: frame.sequence,
            page_number: frame.page_number,
            scale: frame.scale,
            width,
            height,
        };
        self.last_frame = Some(rendered);
        debug!(page = rendered.page_number, scale = rendered.scale, width, height, "frame committed");
        CommitOutcome::Applied(rendered)
    }

    /// Render the current view and commit it. Failures are logged and leave
    /// both surfaces as they were.
    pub async fn render(&mut self) -> Result<RenderedFrame, RenderError> {
        let job = self.begin_render()?;
        let page = job.page_number();
        let rasterizer = self.rasterizer();

        let frame = match job.run(rasterizer.as_ref()).await {
            Ok(frame) => frame,
            Err(e) => {
                error!(page, error = %e, "render failed");
                return Err(e);
            }
        };

        match self.commit(frame) {
            CommitOutcome::Applied(rendered) => Ok(rendered),
            CommitOutcome::Stale { sequence, .. } => Err(RenderError::Superseded(sequence)),
        }
    }
}

/// Round to 2 decimal places so repeated ±step does not drift.
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
