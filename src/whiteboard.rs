//! Whiteboard page-gallery shape.
//!
//! A `pdf-viewer` shape embeds pre-rendered pages (PNG data URLs) inside a
//! whiteboard canvas. The shape is plain data plus a few pure functions the
//! canvas host calls: geometry for hit testing, an indicator for selection,
//! and a view tree describing what to draw.

use serde::{Deserialize, Serialize};

use crate::config::ShapeSize;

pub const SHAPE_TYPE: &str = "pdf-viewer";
pub const DEFAULT_TITLE: &str = "PDF Viewer";

const MINIMIZED_HEIGHT: f64 = 40.0;
const CORNER_RADIUS: f64 = 12.0;
/// Resizing never shrinks the shape below its title bar.
const MIN_SIZE: f64 = MINIMIZED_HEIGHT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfViewerProps {
    pub pages: Vec<String>,
    pub w: f64,
    pub h: f64,
    pub minimized: bool,
    pub maximized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for PdfViewerProps {
    fn default() -> Self {
        Self::with_size(ShapeSize::default())
    }
}

impl PdfViewerProps {
    pub fn with_size(size: ShapeSize) -> Self {
        Self {
            pages: Vec::new(),
            w: size.w,
            h: size.h,
            minimized: false,
            maximized: false,
            title: Some(DEFAULT_TITLE.to_string()),
        }
    }
}

/// A `pdf-viewer` shape as stored on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfViewerShape {
    #[serde(rename = "type")]
    pub kind: String,
    pub props: PdfViewerProps,
}

impl Default for PdfViewerShape {
    fn default() -> Self {
        Self::new(PdfViewerProps::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geometry {
    pub width: f64,
    pub height: f64,
    pub filled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicator {
    pub width: f64,
    pub height: f64,
    pub corner_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCard {
    pub src: String,
    pub alt: String,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GalleryBody {
    Cards { cards: Vec<PageCard> },
    Empty { message: String },
}

/// What the canvas host should draw for a shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ShapeView {
    TitleBar { width: f64, height: f64, label: String },
    Gallery { width: f64, height: f64, title: String, body: GalleryBody },
}

impl PdfViewerShape {
    pub fn new(props: PdfViewerProps) -> Self {
        Self { kind: SHAPE_TYPE.to_string(), props }
    }

    /// A shape showing `pages`, sized from config.
    pub fn from_pages(pages: Vec<String>, title: Option<String>, size: ShapeSize) -> Self {
        let mut props = PdfViewerProps::with_size(size);
        props.pages = pages;
        if title.is_some() {
            props.title = title;
        }
        Self::new(props)
    }

    pub fn is_aspect_ratio_locked(&self) -> bool {
        false
    }

    pub fn can_resize(&self) -> bool {
        true
    }

    /// Apply a resize from the canvas. Width and height change independently.
    pub fn on_resize(&mut self, w: f64, h: f64) {
        if w.is_finite() {
            self.props.w = w.max(MIN_SIZE);
        }
        if h.is_finite() {
            self.props.h = h.max(MIN_SIZE);
        }
    }

    pub fn geometry(&self) -> Geometry {
        Geometry { width: self.props.w, height: self.props.h, filled: true }
    }

    pub fn indicator(&self) -> Indicator {
        Indicator { width: self.props.w, height: self.props.h, corner_radius: CORNER_RADIUS }
    }

    pub fn render(&self) -> ShapeView {
        let props = &self.props;

        if props.minimized {
            let title = props.title.as_deref().unwrap_or("PDF");
            return ShapeView::TitleBar {
                width: props.w,
                height: MINIMIZED_HEIGHT,
                label: format!("📄 {title}"),
            };
        }

        let body = if props.pages.is_empty() {
            GalleryBody::Empty { message: "No pages loaded".to_string() }
        } else {
            let cards = props
                .pages
                .iter()
                .enumerate()
                .map(|(i, src)| PageCard {
                    src: src.clone(),
                    alt: format!("Page {}", i + 1),
                    footer: format!("Page {}", i + 1),
                })
                .collect();
            GalleryBody::Cards { cards }
        };

        ShapeView::Gallery {
            width: props.w,
            height: props.h,
            title: props.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_fresh_shape() {
        let shape = PdfViewerShape::default();
        assert_eq!(shape.kind, "pdf-viewer");
        assert_eq!((shape.props.w, shape.props.h), (720.0, 480.0));
        assert_eq!(shape.props.title.as_deref(), Some("PDF Viewer"));
        assert!(shape.props.pages.is_empty());
        assert!(!shape.is_aspect_ratio_locked());
        assert!(shape.can_resize());
    }

    #[test]
    fn empty_gallery_says_so() {
        let view = PdfViewerShape::default().render();
        let ShapeView::Gallery { title, body, .. } = view else {
            panic!("expected gallery view");
        };
        assert_eq!(title, "PDF Viewer");
        assert_eq!(body, GalleryBody::Empty { message: "No pages loaded".to_string() });
    }

    #[test]
    fn cards_are_numbered_from_one() {
        let pages = vec!["data:image/png;base64,AAA".to_string(), "data:image/png;base64,BBB".to_string()];
        let shape = PdfViewerShape::from_pages(pages, None, ShapeSize::default());

        let ShapeView::Gallery { body: GalleryBody::Cards { cards }, .. } = shape.render() else {
            panic!("expected page cards");
        };
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].src, "data:image/png;base64,BBB");
        assert_eq!(cards[1].alt, "Page 2");
        assert_eq!(cards[1].footer, "Page 2");
    }

    #[test]
    fn minimized_shows_condensed_title_bar() {
        let mut shape = PdfViewerShape::default();
        shape.props.minimized = true;
        shape.props.title = None;

        assert_eq!(
            shape.render(),
            ShapeView::TitleBar { width: 720.0, height: 40.0, label: "📄 PDF".to_string() }
        );

        shape.props.title = Some("Q3 report".to_string());
        let ShapeView::TitleBar { label, .. } = shape.render() else {
            panic!("expected title bar");
        };
        assert_eq!(label, "📄 Q3 report");
    }

    #[test]
    fn missing_title_falls_back_in_gallery() {
        let mut shape = PdfViewerShape::default();
        shape.props.title = None;
        let ShapeView::Gallery { title, .. } = shape.render() else {
            panic!("expected gallery view");
        };
        assert_eq!(title, "PDF Viewer");
    }

    #[test]
    fn resize_is_free_form_with_a_floor() {
        let mut shape = PdfViewerShape::default();
        shape.on_resize(300.0, 900.0);
        assert_eq!((shape.props.w, shape.props.h), (300.0, 900.0));

        shape.on_resize(5.0, f64::NAN);
        assert_eq!((shape.props.w, shape.props.h), (40.0, 900.0));
    }

    #[test]
    fn geometry_and_indicator_follow_size() {
        let mut shape = PdfViewerShape::default();
        shape.on_resize(400.0, 250.0);
        assert_eq!(shape.geometry(), Geometry { width: 400.0, height: 250.0, filled: true });
        assert_eq!(shape.indicator().corner_radius, 12.0);
        assert_eq!((shape.indicator().width, shape.indicator().height), (400.0, 250.0));
    }

    #[test]
    fn untitled_shape_parses_and_omits_title() {
        let json = r#"{"type":"pdf-viewer","props":{"pages":[],"w":100,"h":50,"minimized":false,"maximized":true}}"#;
        let shape: PdfViewerShape = serde_json::from_str(json).unwrap();
        assert_eq!(shape.props.title, None);
        assert!(shape.props.maximized);
        assert!(!serde_json::to_string(&shape).unwrap().contains("title"));
    }
}
