//! The seam between the viewer core and whatever actually decodes PDFs.
//!
//! The core never sees a backend's internal document representation. Each
//! backend exposes its own opaque `Document` and `Page` handle types and the
//! controller only moves them around.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::viewer::DisplaySurface;

/// Errors raised while turning file bytes into a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to initialize PDF backend: {0}")]
    Backend(String),

    #[error("Failed to read PDF: {0}")]
    Unreadable(String),

    #[error("Not a valid PDF document: {0}")]
    Rejected(String),

    #[error("Failed to convert PDF pages: {0}")]
    Conversion(String),
}

/// Errors raised while resolving or painting a page of a loaded document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("No document loaded")]
    NoDocument,

    #[error("Invalid page number: {0}")]
    InvalidPage(u32),

    #[error("Failed to resolve page {page}: {reason}")]
    PageResolution { page: u32, reason: String },

    #[error("Rendering failed: {0}")]
    Paint(String),

    #[error("Page surface of {width}x{height} pixels cannot be allocated")]
    SurfaceSize { width: u32, height: u32 },

    #[error("Render request {0} was superseded by a newer one")]
    Superseded(u64),
}

impl Serialize for LoadError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl Serialize for RenderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, used when a page carries no usable `MediaBox`.
    pub const LETTER: PageSize = PageSize { width: 612.0, height: 792.0 };

    pub fn viewport(self, scale: f64) -> Viewport {
        Viewport { width: f64::from(self.width) * scale, height: f64::from(self.height) * scale }
    }
}

/// Page dimensions at a given scale, in device pixels (fractional).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Bitmap size that fully covers the viewport.
    pub fn surface_size(self) -> (u32, u32) {
        (ceil_px(self.width), ceil_px(self.height))
    }
}

/// Largest bitmap a render may allocate (64 MP, 256 MiB of RGBA).
pub const MAX_SURFACE_PIXELS: u64 = 64 * 1024 * 1024;

impl Viewport {
    /// Like [`Viewport::surface_size`], but refuses empty surfaces and ones
    /// larger than [`MAX_SURFACE_PIXELS`] before anything is allocated.
    pub fn checked_surface_size(self) -> Result<(u32, u32), RenderError> {
        let (width, height) = self.surface_size();
        let pixels = u64::from(width) * u64::from(height);
        if pixels == 0 || pixels > MAX_SURFACE_PIXELS {
            return Err(RenderError::SurfaceSize { width, height });
        }
        Ok((width, height))
    }
}

fn ceil_px(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.ceil().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// A PDF backend able to decode documents and paint pages into a surface.
///
/// Page numbers are 1-based everywhere on this trait. Every call may suspend;
/// blocking backends are expected to move their work off the async caller.
pub trait Rasterizer: Send + Sync + 'static {
    /// Opaque handle to a decoded document. Cloning must be cheap.
    type Document: Clone + Send + Sync + 'static;
    /// Opaque handle to a resolved page.
    type Page: Send + Sync + 'static;

    fn load(
        &self,
        bytes: Arc<[u8]>,
    ) -> impl Future<Output = Result<Self::Document, LoadError>> + Send;

    fn page_count(&self, document: &Self::Document) -> u32;

    /// Title from the document's metadata, when it has one.
    fn document_title(&self, _document: &Self::Document) -> Option<String> {
        None
    }

    fn get_page(
        &self,
        document: &Self::Document,
        page_number: u32,
    ) -> impl Future<Output = Result<Self::Page, RenderError>> + Send;

    fn viewport(&self, page: &Self::Page, scale: f64) -> Viewport;

    /// Paint `page` into `target`, which is already sized to `viewport`.
    fn render(
        &self,
        page: &Self::Page,
        viewport: Viewport,
        target: &mut DisplaySurface,
    ) -> impl Future<Output = Result<(), RenderError>> + Send;
}
