// PDF Annotator - viewer core
//
// Renders one PDF page at a time into a display surface, keeps a transparent
// ink surface aligned with it for freehand annotation, and exposes the
// commands a shell (desktop UI, whiteboard canvas or the bundled CLI) drives
// it with.

pub mod annotations;
pub mod cli;
pub mod commands;
pub mod config;
pub mod input;
pub mod pdf;
pub mod print;
pub mod viewer;
pub mod whiteboard;

#[cfg(test)]
mod test_support;

pub use annotations::{AnnotationOverlay, PenColor, PenConfig};
pub use commands::{FileSelection, Notification, ShellState, ViewerCommand, ViewerSession};
pub use config::ViewerConfig;
pub use pdf::{LoadError, Rasterizer, RenderError};
pub use viewer::PageRenderController;
