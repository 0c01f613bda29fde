//! Page display and ink surfaces plus the controller that keeps them in step.

mod controller;
mod surface;

pub use controller::{
    CommitOutcome, ControllerState, DocumentSummary, PageRenderController, PaintedFrame,
    RenderJob, RenderedFrame, ViewState,
};
pub use surface::{composite, AnnotationSurface, DisplaySurface, InkColor};
