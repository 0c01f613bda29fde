//! Shared fixtures for unit tests.

use lopdf::{dictionary, Document, Object};
use std::future::Future;
use std::sync::Arc;

use crate::pdf::{
    GeometryDocument, GeometryPage, LoadError, LopdfRasterizer, Rasterizer, RenderError, Viewport,
};
use crate::viewer::DisplaySurface;

/// A minimal PDF whose pages have the given `(width, height)` MediaBoxes.
pub(crate) fn pdf_with_pages(sizes: &[(i64, i64)]) -> Vec<u8> {
    build_pdf(sizes, None)
}

/// Like [`pdf_with_pages`], with `title` in the document Info dictionary.
pub(crate) fn pdf_with_title(sizes: &[(i64, i64)], title: &str) -> Vec<u8> {
    build_pdf(sizes, Some(title))
}

fn build_pdf(sizes: &[(i64, i64)], title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = sizes
        .iter()
        .map(|&(width, height)| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height)
                ]
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count)
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! { "Title" => Object::string_literal(title) });
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory PDF should serialize");
    bytes
}

/// Geometry rasterizer whose `render` fails for one page number.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlakyRasterizer {
    inner: LopdfRasterizer,
    failing_page: u32,
}

impl FlakyRasterizer {
    pub(crate) fn failing_on(page: u32) -> Self {
        Self { inner: LopdfRasterizer::new(), failing_page: page }
    }
}

impl Rasterizer for FlakyRasterizer {
    type Document = GeometryDocument;
    type Page = GeometryPage;

    fn load(
        &self,
        bytes: Arc<[u8]>,
    ) -> impl Future<Output = Result<Self::Document, LoadError>> + Send {
        self.inner.load(bytes)
    }

    fn page_count(&self, document: &Self::Document) -> u32 {
        self.inner.page_count(document)
    }

    fn document_title(&self, document: &Self::Document) -> Option<String> {
        self.inner.document_title(document)
    }

    fn get_page(
        &self,
        document: &Self::Document,
        page_number: u32,
    ) -> impl Future<Output = Result<Self::Page, RenderError>> + Send {
        self.inner.get_page(document, page_number)
    }

    fn viewport(&self, page: &Self::Page, scale: f64) -> Viewport {
        self.inner.viewport(page, scale)
    }

    fn render(
        &self,
        page: &Self::Page,
        viewport: Viewport,
        target: &mut DisplaySurface,
    ) -> impl Future<Output = Result<(), RenderError>> + Send {
        let fail = page.number() == self.failing_page;
        let inner = self.inner;
        async move {
            if fail {
                return Err(RenderError::Paint("injected failure".to_string()));
            }
            inner.render(page, viewport, target).await
        }
    }
}
