//! Whole-document conversion to PNG data URLs for the page gallery.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbaImage;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, error};

use super::rasterizer::{LoadError, Rasterizer};
use crate::viewer::DisplaySurface;

/// Encode an RGBA image as a `data:image/png;base64,...` URL.
pub fn png_data_url(image: &RgbaImage) -> Result<String, LoadError> {
    let mut png_bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| LoadError::Conversion(format!("PNG encoding failed: {e}")))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png_bytes)))
}

/// Every page of a document as PNG data URLs, plus its metadata title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPages {
    pub title: Option<String>,
    pub pages: Vec<String>,
}

/// Rasterize every page at `scale` into PNG data URLs, in page order.
///
/// Any failure along the way aborts the whole conversion with a single
/// [`LoadError`]; partial galleries are never returned.
pub async fn pages_to_images<R: Rasterizer>(
    rasterizer: &R,
    bytes: impl Into<Arc<[u8]>>,
    scale: f64,
) -> Result<Vec<String>, LoadError> {
    render_gallery(rasterizer, bytes, scale).await.map(|gallery| gallery.pages)
}

/// [`pages_to_images`], keeping the document title for the shape header.
pub async fn render_gallery<R: Rasterizer>(
    rasterizer: &R,
    bytes: impl Into<Arc<[u8]>>,
    scale: f64,
) -> Result<GalleryPages, LoadError> {
    let document = rasterizer.load(bytes.into()).await.map_err(|e| {
        error!(error = %e, "gallery conversion could not load document");
        e
    })?;
    let page_count = rasterizer.page_count(&document);
    let mut pages = Vec::with_capacity(page_count as usize);

    for page_number in 1..=page_count {
        let page = rasterizer
            .get_page(&document, page_number)
            .await
            .map_err(|e| LoadError::Conversion(e.to_string()))?;
        let viewport = rasterizer.viewport(&page, scale);
        let (width, height) = viewport
            .checked_surface_size()
            .map_err(|e| LoadError::Conversion(e.to_string()))?;

        let mut surface = DisplaySurface::new(width, height);
        rasterizer
            .render(&page, viewport, &mut surface)
            .await
            .map_err(|e| LoadError::Conversion(e.to_string()))?;

        pages.push(png_data_url(surface.image())?);
        debug!(page_number, width, height, "gallery page converted");
    }

    Ok(GalleryPages { title: rasterizer.document_title(&document), pages })
}
