//! PDF backends.
//!
//! This module provides:
//! - The [`Rasterizer`] seam the viewer renders through
//! - A PDFium backend for native-quality output
//! - A lopdf geometry backend for machines without PDFium
//! - Whole-document conversion to PNG data URLs for the page gallery

mod gallery;
mod geometry;
mod rasterizer;
mod renderer;

pub use gallery::{pages_to_images, png_data_url, render_gallery, GalleryPages};
pub use geometry::{GeometryDocument, GeometryPage, LopdfRasterizer};
pub use rasterizer::{LoadError, PageSize, Rasterizer, RenderError, Viewport};
pub use renderer::{init_pdfium, PdfiumDocument, PdfiumPage, PdfiumRasterizer};
