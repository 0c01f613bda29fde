//! Bitmap surfaces: the page display surface and the transparent ink surface.

use image::{Rgba, RgbaImage};
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Page pixels for the current page at the current scale.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySurface {
    pixels: RgbaImage,
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl DisplaySurface {
    /// A fully transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: RgbaImage::from_pixel(width, height, TRANSPARENT) }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    /// One-pixel frame along the surface edges.
    pub fn stroke_border(&mut self, color: Rgba<u8>) {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        for x in 0..width {
            self.pixels.put_pixel(x, 0, color);
            self.pixels.put_pixel(x, height - 1, color);
        }
        for y in 0..height {
            self.pixels.put_pixel(0, y, color);
            self.pixels.put_pixel(width - 1, y, color);
        }
    }

    /// Copy rasterized page pixels in at the origin. Anything outside the
    /// surface bounds is dropped.
    pub fn paint(&mut self, source: &RgbaImage) {
        image::imageops::replace(&mut self.pixels, source, 0, 0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.pixels.get_pixel_checked(x, y).copied()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

/// An RGBA color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Transparent layer that accumulates ink. Tracks its own size so that a
/// zero-area surface (nothing rendered yet) is representable.
#[derive(Debug, Clone)]
pub struct AnnotationSurface {
    width: u32,
    height: u32,
    pixmap: Option<Pixmap>,
}

impl Default for AnnotationSurface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl AnnotationSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixmap: Pixmap::new(width, height) }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize and wipe. Reallocating always yields a transparent pixmap.
    pub fn resize_and_clear(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.pixmap.as_ref().map_or(true, |pixmap| pixmap.data().iter().all(|byte| *byte == 0))
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixmap.as_ref().and_then(|pixmap| pixmap.pixel(x, y)).map_or(0, |p| p.alpha())
    }

    /// Paint one anti-aliased segment with round caps and joins. Returns
    /// `false` when nothing could be drawn (empty surface or degenerate path).
    pub fn stroke_segment(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: InkColor,
        width: f32,
    ) -> bool {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return false;
        };

        let mut builder = PathBuilder::new();
        builder.move_to(from.0, from.1);
        builder.line_to(to.0, to.1);
        let Some(path) = builder.finish() else {
            return false;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;

        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        true
    }

    /// Straight-alpha copy of the ink, for compositing.
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(self.width, self.height, TRANSPARENT);
        if let Some(pixmap) = self.pixmap.as_ref() {
            for (target, source) in image.pixels_mut().zip(pixmap.pixels()) {
                let color = source.demultiply();
                *target = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
            }
        }
        image
    }
}

/// Flatten the ink layer over the page pixels into a new image. The two
/// surfaces themselves stay untouched.
pub fn composite(display: &DisplaySurface, annotations: &AnnotationSurface) -> RgbaImage {
    let mut flattened = display.image().clone();
    image::imageops::overlay(&mut flattened, &annotations.to_image(), 0, 0);
    flattened
}
