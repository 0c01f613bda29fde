//! Geometry-only rasterizer built on lopdf.
//!
//! Reads page sizes from the page tree and paints each page as a blank sheet
//! with a light border. Used when PDFium is not available on the machine.

use image::Rgba;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::rasterizer::{LoadError, PageSize, Rasterizer, RenderError, Viewport};
use crate::viewer::DisplaySurface;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDGE: Rgba<u8> = Rgba([220, 220, 220, 255]);

/// Bound on `Parent` hops when looking for an inherited `MediaBox`.
const MAX_INHERIT_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct GeometryDocument {
    page_sizes: Arc<[PageSize]>,
    title: Option<Arc<str>>,
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryPage {
    number: u32,
    size: PageSize,
}

impl GeometryPage {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> PageSize {
        self.size
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfRasterizer;

impl LopdfRasterizer {
    pub fn new() -> Self {
        Self
    }
}

fn parse_document(bytes: &[u8]) -> Result<GeometryDocument, LoadError> {
    let doc = Document::load_mem(bytes).map_err(|e| LoadError::Rejected(e.to_string()))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(LoadError::Rejected(
            "encrypted PDFs are not supported by the geometry backend".to_string(),
        ));
    }

    let page_sizes: Vec<PageSize> = doc
        .get_pages()
        .into_values()
        .map(|page_id| media_box(&doc, page_id).unwrap_or(PageSize::LETTER))
        .collect();

    Ok(GeometryDocument { page_sizes: page_sizes.into(), title: info_title(&doc).map(Arc::from) })
}

/// `Title` from the trailer's `Info` dictionary, if present and non-blank.
fn info_title(doc: &Document) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let (_, info) = doc.dereference(info).ok()?;
    let title = info.as_dict().ok()?.get(b"Title").ok()?.as_str().ok()?;
    let text = decode_text_string(title);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// PDF text strings are UTF-16BE when they start with a BOM; anything else
/// is read as (close enough to) Latin text.
fn decode_text_string(raw: &[u8]) -> String {
    match raw.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> =
                utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut current: &Dictionary = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERIT_DEPTH {
        let found = current
            .get(b"MediaBox")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_array().ok());
        if let Some(size) = found.and_then(|array| size_from_box(array)) {
            return Some(size);
        }

        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }

    None
}

fn size_from_box(array: &[Object]) -> Option<PageSize> {
    if array.len() != 4 {
        return None;
    }
    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;
    Some(PageSize { width: (x1 - x0).abs(), height: (y1 - y0).abs() })
}

impl Rasterizer for LopdfRasterizer {
    type Document = GeometryDocument;
    type Page = GeometryPage;

    fn load(
        &self,
        bytes: Arc<[u8]>,
    ) -> impl Future<Output = Result<Self::Document, LoadError>> + Send {
        async move {
            let document = tokio::task::spawn_blocking(move || parse_document(&bytes))
                .await
                .map_err(|e| LoadError::Backend(e.to_string()))??;
            debug!(pages = document.page_sizes.len(), title = ?document.title, "page tree parsed");
            Ok(document)
        }
    }

    fn page_count(&self, document: &Self::Document) -> u32 {
        u32::try_from(document.page_sizes.len()).unwrap_or(u32::MAX)
    }

    fn document_title(&self, document: &Self::Document) -> Option<String> {
        document.title.as_deref().map(str::to_string)
    }

    fn get_page(
        &self,
        document: &Self::Document,
        page_number: u32,
    ) -> impl Future<Output = Result<Self::Page, RenderError>> + Send {
        let size = (page_number as usize)
            .checked_sub(1)
            .and_then(|index| document.page_sizes.get(index).copied());
        async move {
            let size = size.ok_or(RenderError::InvalidPage(page_number))?;
            Ok(GeometryPage { number: page_number, size })
        }
    }

    fn viewport(&self, page: &Self::Page, scale: f64) -> Viewport {
        page.size.viewport(scale)
    }

    fn render(
        &self,
        _page: &Self::Page,
        _viewport: Viewport,
        target: &mut DisplaySurface,
    ) -> impl Future<Output = Result<(), RenderError>> + Send {
        async move {
            target.fill(PAPER);
            let (width, height) = target.dimensions();
            if width >= 4 && height >= 4 {
                target.stroke_border(EDGE);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pdf_with_pages, pdf_with_title};
    use lopdf::dictionary;

    #[tokio::test]
    async fn reads_page_count_and_sizes() {
        let rasterizer = LopdfRasterizer::new();
        let bytes = pdf_with_pages(&[(200, 100), (300, 150)]);
        let doc = rasterizer.load(bytes.into()).await.expect("load should succeed");

        assert_eq!(rasterizer.page_count(&doc), 2);
        let page = rasterizer.get_page(&doc, 2).await.expect("page 2 exists");
        assert_eq!(page.size(), PageSize { width: 300.0, height: 150.0 });
    }

    #[tokio::test]
    async fn rejects_bytes_that_are_not_a_pdf() {
        let rasterizer = LopdfRasterizer::new();
        let err = rasterizer
            .load(b"PK\x03\x04 definitely a zip".to_vec().into())
            .await
            .expect_err("garbage must not load");

        assert!(matches!(err, LoadError::Rejected(_)));
    }

    #[tokio::test]
    async fn unknown_page_number_is_invalid() {
        let rasterizer = LopdfRasterizer::new();
        let doc = rasterizer.load(pdf_with_pages(&[(200, 100)]).into()).await.unwrap();

        assert_eq!(rasterizer.get_page(&doc, 0).await.unwrap_err(), RenderError::InvalidPage(0));
        assert_eq!(rasterizer.get_page(&doc, 2).await.unwrap_err(), RenderError::InvalidPage(2));
    }

    #[tokio::test]
    async fn render_paints_paper_with_border() {
        let rasterizer = LopdfRasterizer::new();
        let doc = rasterizer.load(pdf_with_pages(&[(20, 10)]).into()).await.unwrap();
        let page = rasterizer.get_page(&doc, 1).await.unwrap();
        let viewport = rasterizer.viewport(&page, 1.0);
        let (width, height) = viewport.surface_size();
        let mut surface = DisplaySurface::new(width, height);

        rasterizer.render(&page, viewport, &mut surface).await.unwrap();

        assert_eq!(surface.pixel(0, 0), Some(EDGE));
        assert_eq!(surface.pixel(10, 5), Some(PAPER));
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]
            }),
        );

        assert_eq!(media_box(&doc, page_id), Some(PageSize { width: 595.0, height: 842.0 }));
    }

    #[test]
    fn indirect_media_box_is_resolved() {
        let mut doc = Document::with_version("1.5");
        let box_id = doc.add_object(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(300),
            Object::Integer(144),
        ]);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => box_id
        });

        assert_eq!(media_box(&doc, page_id), Some(PageSize { width: 300.0, height: 144.0 }));
    }

    #[tokio::test]
    async fn encrypt_text_in_content_is_not_encryption() {
        let rasterizer = LopdfRasterizer::new();
        let bytes = pdf_with_title(&[(50, 50)], "Notes on /Encrypt dictionaries");
        assert!(bytes.windows(8).any(|w| w == b"/Encrypt"));

        let doc = rasterizer.load(bytes.into()).await.expect("plain PDF should load");
        assert_eq!(rasterizer.page_count(&doc), 1);
    }

    #[tokio::test]
    async fn encrypted_trailer_is_rejected() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => Object::Integer(0)
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        let encrypt_id = doc.add_object(dictionary! { "Filter" => "Standard", "V" => Object::Integer(99) });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Encrypt", encrypt_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let err = LopdfRasterizer::new().load(bytes.into()).await.unwrap_err();
        assert!(matches!(err, LoadError::Rejected(_)));
    }

    #[tokio::test]
    async fn title_comes_from_info_dictionary() {
        let rasterizer = LopdfRasterizer::new();
        let titled = rasterizer.load(pdf_with_title(&[(10, 10)], "  Board deck ").into()).await.unwrap();
        let untitled = rasterizer.load(pdf_with_pages(&[(10, 10)]).into()).await.unwrap();

        assert_eq!(rasterizer.document_title(&titled).as_deref(), Some("Board deck"));
        assert_eq!(rasterizer.document_title(&untitled), None);
    }

    #[test]
    fn utf16_text_strings_are_decoded() {
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0xE9]), "Hé");
        assert_eq!(decode_text_string(b"plain"), "plain");
    }

    #[test]
    fn missing_media_box_has_no_size() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });

        assert_eq!(media_box(&doc, page_id), None);
    }
}
