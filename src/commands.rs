//! Commands the interaction shell sends to the viewer.
//!
//! [`ViewerSession`] is the boundary between a UI (or the CLI) and the core:
//! it owns the render controller, the pen settings and the print resource,
//! re-renders after anything that changes the view, and reports back a
//! [`ShellState`] snapshot for the shell to reflect.
//!
//! Load failures become user-facing [`Notification`]s; render failures are
//! only logged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::annotations::{PenColor, PenConfig};
use crate::config::ViewerConfig;
use crate::input::{dispatch_pointer, PointerEvent, PointerOutcome, SurfaceLayout};
use crate::pdf::{render_gallery, LoadError, Rasterizer};
use crate::print::{print_resource, PrintError, PrintHost, PrintResource};
use crate::viewer::{ControllerState, DocumentSummary, PageRenderController};
use crate::whiteboard::PdfViewerShape;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load PDF. Please try another file.";

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileSelection {
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: PDF_MIME_TYPE.to_string(), bytes }
    }

    /// Whether the picker's PDF filter would have let this file through.
    /// Content is not checked; the rasterizer rejects disguised files.
    pub fn passes_picker_filter(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}

/// Messages for the user, delivered out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notification {
    Alert(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    OpenFile(FileSelection),
    PrevPage,
    NextPage,
    GoToPage(u32),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    SetScale(f64),
    SetPenColor(PenColor),
    SetPenWidth(u8),
    ClearAnnotations,
}

/// Everything the shell needs to draw its toolbar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellState {
    pub state: String,
    pub file_name: Option<String>,
    pub current_page: u32,
    pub page_count: u32,
    pub page_label: String,
    pub zoom_percent: u32,
    pub can_prev: bool,
    pub can_next: bool,
    pub can_print: bool,
    pub show_placeholder: bool,
    pub pen: PenConfig,
    pub drawing: bool,
}

pub struct ViewerSession<R: Rasterizer> {
    controller: PageRenderController<R>,
    config: ViewerConfig,
    pen: PenConfig,
    print_resource: Option<PrintResource>,
    next_id: u32,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<R: Rasterizer> ViewerSession<R> {
    pub fn new(rasterizer: R, config: ViewerConfig) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            controller: PageRenderController::new(rasterizer, config.zoom),
            pen: config.pen,
            config,
            print_resource: None,
            next_id: 1,
            notifications: tx,
        };
        (session, rx)
    }

    pub fn controller(&self) -> &PageRenderController<R> {
        &self.controller
    }

    pub fn pen(&self) -> PenConfig {
        self.pen
    }

    pub fn print_resource(&self) -> Option<&PrintResource> {
        self.print_resource.as_ref()
    }

    fn generate_id(&mut self) -> String {
        let current = self.next_id;
        self.next_id += 1;
        format!("doc_{}", current)
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            debug!("notification dropped, no listener");
        }
    }

    /// Load a picked file and render its first page. A failure is logged,
    /// reported to the user and returned; the previous document stays.
    pub async fn open_file(&mut self, file: FileSelection) -> Result<DocumentSummary, LoadError> {
        let result = if file.passes_picker_filter() {
            let bytes: Arc<[u8]> = file.bytes.into();
            self.controller.load_document(Arc::clone(&bytes)).await.map(|summary| (summary, bytes))
        } else {
            Err(LoadError::Rejected(format!("{} is not {}", file.mime_type, PDF_MIME_TYPE)))
        };

        match result {
            Ok((summary, bytes)) => {
                let id = self.generate_id();
                if let Some(previous) = self.print_resource.take() {
                    debug!(id = previous.id(), "releasing print resource");
                }
                info!(id = %id, file = %file.name, pages = summary.page_count, "file opened");
                self.print_resource = Some(PrintResource::new(id, file.name, bytes));
                self.rerender().await;
                Ok(summary)
            }
            Err(e) => {
                error!(file = %file.name, error = %e, "failed to open file");
                self.notify(Notification::Alert(LOAD_FAILED_MESSAGE.to_string()));
                Err(e)
            }
        }
    }

    /// Apply one command and report the resulting shell state.
    pub async fn dispatch(&mut self, command: ViewerCommand) -> ShellState {
        debug!(?command, "dispatch");
        let view_changed = match command {
            ViewerCommand::OpenFile(file) => {
                // Success already rendered; failure already reported.
                let _ = self.open_file(file).await;
                false
            }
            ViewerCommand::PrevPage => self.controller.prev_page(),
            ViewerCommand::NextPage => self.controller.next_page(),
            ViewerCommand::GoToPage(n) => self.controller.set_page(n),
            ViewerCommand::ZoomIn => self.controller.zoom_in(),
            ViewerCommand::ZoomOut => self.controller.zoom_out(),
            ViewerCommand::ResetZoom => self.controller.reset_scale(),
            ViewerCommand::SetScale(scale) => self.controller.set_scale(scale),
            ViewerCommand::SetPenColor(color) => {
                self.pen.set_color(color);
                false
            }
            ViewerCommand::SetPenWidth(width) => {
                self.pen.set_width(width);
                false
            }
            ViewerCommand::ClearAnnotations => {
                self.controller.overlay_mut().clear();
                false
            }
        };

        if view_changed {
            self.rerender().await;
        }
        self.shell_state()
    }

    /// Route a pointer event to the annotation overlay.
    pub fn pointer(&mut self, event: PointerEvent, layout: &dyn SurfaceLayout) -> PointerOutcome {
        if !self.controller.is_loaded() {
            return PointerOutcome::Ignored;
        }
        dispatch_pointer(self.controller.overlay_mut(), event, layout, &self.pen)
    }

    /// Print the loaded file through `host`.
    pub async fn print<H: PrintHost>(&self, host: &H) -> Result<(), PrintError> {
        let resource = self.print_resource.as_ref().ok_or(PrintError::Disabled)?;
        print_resource(host, resource).await.map_err(|e| {
            error!(id = resource.id(), error = %e, "print failed");
            e
        })
    }

    /// Pre-render every page of `bytes` into a whiteboard gallery shape.
    /// Without an explicit `title` the document's own title is used.
    pub async fn gallery_shape(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        title: Option<String>,
    ) -> Result<PdfViewerShape, LoadError> {
        let rasterizer = self.controller.rasterizer();
        let gallery = render_gallery(rasterizer.as_ref(), bytes, self.config.gallery_scale).await?;
        let title = title.or(gallery.title);
        Ok(PdfViewerShape::from_pages(gallery.pages, title, self.config.shape_size))
    }

    async fn rerender(&mut self) {
        // The controller has already logged the failure and kept the last frame.
        let _ = self.controller.render().await;
    }

    pub fn shell_state(&self) -> ShellState {
        let loaded = self.controller.is_loaded();
        let view = self.controller.view();
        let (current_page, page_count) =
            if loaded { (view.current_page, self.controller.page_count()) } else { (0, 0) };
        let state = match self.controller.state() {
            ControllerState::Empty => "empty",
            ControllerState::Loading => "loading",
            ControllerState::Ready => "ready",
        };

        ShellState {
            state: state.to_string(),
            file_name: self.print_resource.as_ref().map(|r| r.file_name().to_string()),
            current_page,
            page_count,
            page_label: format!("Page {} / {}", current_page, page_count),
            zoom_percent: (view.scale * 100.0).round() as u32,
            can_prev: self.controller.can_go_prev(),
            can_next: self.controller.can_go_next(),
            can_print: self.print_resource.is_some(),
            show_placeholder: !loaded,
            pen: self.pen,
            drawing: self.controller.overlay().is_drawing(),
        }
    }
}
