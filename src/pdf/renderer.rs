//! PDFium-backed rasterizer using pdfium-render for native-quality output.
//!
//! Note: pdfium-render's Pdfium struct is not Send+Sync, so we never store it.
//! The library location is resolved once at startup by [`init_pdfium`]; each
//! operation then binds a fresh instance on a blocking thread and drops it
//! before returning.

use pdfium_render::prelude::*;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::rasterizer::{LoadError, PageSize, Rasterizer, RenderError, Viewport};
use crate::viewer::DisplaySurface;

/// Where the PDFium library was found during [`init_pdfium`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum LibrarySource {
    Path(PathBuf),
    System,
}

static LIBRARY: OnceLock<LibrarySource> = OnceLock::new();

/// Document metadata read once at load.
#[derive(Debug, Clone)]
struct DocumentInfo {
    page_count: u32,
    title: Option<String>,
    pdf_version: String,
}

/// Locate and bind the PDFium library once for the whole process.
///
/// `extra_dirs` are searched before the built-in locations. Calling this again
/// after a successful initialization is a no-op.
pub fn init_pdfium(extra_dirs: &[PathBuf]) -> Result<(), LoadError> {
    if LIBRARY.get().is_some() {
        return Ok(());
    }

    let source = resolve_library(extra_dirs)?;
    info!(?source, "PDFium library resolved");
    let _ = LIBRARY.set(source);
    Ok(())
}

fn resolve_library(extra_dirs: &[PathBuf]) -> Result<LibrarySource, LoadError> {
    for candidate in candidate_paths(extra_dirs) {
        if !candidate.exists() {
            continue;
        }
        match Pdfium::bind_to_library(&candidate) {
            Ok(_) => return Ok(LibrarySource::Path(candidate)),
            Err(e) => warn!(path = %candidate.display(), error = ?e, "Failed to bind PDFium"),
        }
    }

    if Pdfium::bind_to_system_library().is_ok() {
        return Ok(LibrarySource::System);
    }

    Err(LoadError::Backend(
        "Could not load PDFium library. Place it next to the executable or install it system-wide."
            .to_string(),
    ))
}

/// Platform-specific search order: caller dirs, next to the executable, the
/// macOS bundle `Frameworks` dir, then the working directory's `lib/`.
fn candidate_paths(extra_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = extra_dirs.to_vec();

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            dirs.push(exe_dir.to_path_buf());
            #[cfg(target_os = "macos")]
            dirs.push(exe_dir.join("..").join("Frameworks"));
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join("lib"));
    }
    #[cfg(target_os = "macos")]
    dirs.push(PathBuf::from("/usr/local/lib"));

    dirs.iter().map(|dir| dir.join(LIBRARY_FILE_NAME)).collect()
}

#[cfg(target_os = "macos")]
const LIBRARY_FILE_NAME: &str = "libpdfium.dylib";
#[cfg(target_os = "windows")]
const LIBRARY_FILE_NAME: &str = "pdfium.dll";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const LIBRARY_FILE_NAME: &str = "libpdfium.so";

fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = match LIBRARY.get() {
        Some(LibrarySource::Path(path)) => Pdfium::bind_to_library(path),
        Some(LibrarySource::System) => Pdfium::bind_to_system_library(),
        None => return Err("PDFium is not initialized; call init_pdfium at startup".to_string()),
    };
    bindings.map(Pdfium::new).map_err(|e| format!("{e:?}"))
}

/// Opaque handle to a document decoded by PDFium.
///
/// Holds the raw bytes because a `PdfDocument` borrows them and cannot outlive
/// the blocking call that opened it.
#[derive(Debug, Clone)]
pub struct PdfiumDocument {
    bytes: Arc<[u8]>,
    info: Arc<DocumentInfo>,
}

/// Opaque handle to a single resolved page.
#[derive(Debug, Clone)]
pub struct PdfiumPage {
    bytes: Arc<[u8]>,
    index: u16,
    size: PageSize,
}

/// Rasterizer backed by the PDFium library.
#[derive(Debug, Clone, Copy)]
pub struct PdfiumRasterizer {
    _private: (),
}

impl PdfiumRasterizer {
    /// Requires a prior successful [`init_pdfium`].
    pub fn new() -> Result<Self, LoadError> {
        if LIBRARY.get().is_none() {
            return Err(LoadError::Backend("PDFium is not initialized".to_string()));
        }
        Ok(Self { _private: () })
    }
}

fn page_index(page_number: u32, page_count: u32) -> Result<u16, RenderError> {
    if page_number == 0 || page_number > page_count {
        return Err(RenderError::InvalidPage(page_number));
    }
    u16::try_from(page_number - 1).map_err(|_| RenderError::InvalidPage(page_number))
}

fn open_document<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, String> {
    pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| e.to_string())
}

fn read_info(bytes: &[u8]) -> Result<DocumentInfo, LoadError> {
    let pdfium = bind_pdfium().map_err(LoadError::Backend)?;
    let doc = open_document(&pdfium, bytes).map_err(LoadError::Rejected)?;

    let metadata = doc.metadata();
    let title = metadata
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().trim().to_string())
        .filter(|t| !t.is_empty());

    Ok(DocumentInfo {
        page_count: u32::from(doc.pages().len()),
        title,
        pdf_version: format!("{:?}", doc.version()),
    })
}

fn read_page_size(bytes: &[u8], index: u16) -> Result<PageSize, RenderError> {
    let page_number = u32::from(index) + 1;
    let resolution = |reason: String| RenderError::PageResolution { page: page_number, reason };

    let pdfium = bind_pdfium().map_err(resolution)?;
    let doc = open_document(&pdfium, bytes).map_err(resolution)?;
    let page = doc.pages().get(index).map_err(|e| resolution(e.to_string()))?;

    Ok(PageSize { width: page.width().value, height: page.height().value })
}

fn rasterize_page(
    bytes: &[u8],
    index: u16,
    width: u32,
    height: u32,
) -> Result<image::RgbaImage, RenderError> {
    let paint = |reason: String| RenderError::Paint(reason);

    let pdfium = bind_pdfium().map_err(paint)?;
    let doc = open_document(&pdfium, bytes).map_err(paint)?;
    let page = doc.pages().get(index).map_err(|e| paint(e.to_string()))?;

    let config = PdfRenderConfig::new()
        .set_target_width(to_i32(width))
        .set_target_height(to_i32(height))
        .render_form_data(true)
        .render_annotations(true);

    let bitmap = page.render_with_config(&config).map_err(|e| paint(e.to_string()))?;
    Ok(bitmap.as_image().to_rgba8())
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl Rasterizer for PdfiumRasterizer {
    type Document = PdfiumDocument;
    type Page = PdfiumPage;

    fn load(
        &self,
        bytes: Arc<[u8]>,
    ) -> impl Future<Output = Result<Self::Document, LoadError>> + Send {
        async move {
            let shared = Arc::clone(&bytes);
            let info = tokio::task::spawn_blocking(move || read_info(&shared))
                .await
                .map_err(|e| LoadError::Backend(e.to_string()))??;

            debug!(pages = info.page_count, version = %info.pdf_version, "PDFium document opened");
            Ok(PdfiumDocument { bytes, info: Arc::new(info) })
        }
    }

    fn page_count(&self, document: &Self::Document) -> u32 {
        document.info.page_count
    }

    fn document_title(&self, document: &Self::Document) -> Option<String> {
        document.info.title.clone()
    }

    fn get_page(
        &self,
        document: &Self::Document,
        page_number: u32,
    ) -> impl Future<Output = Result<Self::Page, RenderError>> + Send {
        let bytes = Arc::clone(&document.bytes);
        let page_count = document.info.page_count;
        async move {
            let index = page_index(page_number, page_count)?;
            let shared = Arc::clone(&bytes);
            let size = tokio::task::spawn_blocking(move || read_page_size(&shared, index))
                .await
                .map_err(|e| RenderError::PageResolution {
                    page: page_number,
                    reason: e.to_string(),
                })??;
            Ok(PdfiumPage { bytes, index, size })
        }
    }

    fn viewport(&self, page: &Self::Page, scale: f64) -> Viewport {
        page.size.viewport(scale)
    }

    fn render(
        &self,
        page: &Self::Page,
        _viewport: Viewport,
        target: &mut DisplaySurface,
    ) -> impl Future<Output = Result<(), RenderError>> + Send {
        let bytes = Arc::clone(&page.bytes);
        let index = page.index;
        let (width, height) = target.dimensions();
        async move {
            let pixels =
                tokio::task::spawn_blocking(move || rasterize_page(&bytes, index, width, height))
                    .await
                    .map_err(|e| RenderError::Paint(e.to_string()))??;
            target.paint(&pixels);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_map_to_zero_based_indices() {
        assert_eq!(page_index(1, 3).unwrap(), 0);
        assert_eq!(page_index(3, 3).unwrap(), 2);
    }

    #[test]
    fn out_of_range_page_numbers_are_rejected() {
        assert_eq!(page_index(0, 3), Err(RenderError::InvalidPage(0)));
        assert_eq!(page_index(4, 3), Err(RenderError::InvalidPage(4)));
    }

    #[test]
    fn candidate_paths_start_with_caller_dirs() {
        let dir = PathBuf::from("/opt/pdfium");
        let paths = candidate_paths(std::slice::from_ref(&dir));
        assert!(paths[0].starts_with(&dir));
    }
}
