//! Freehand ink overlay.
//!
//! Strokes are purely additive raster drawing on an [`AnnotationSurface`]
//! aligned 1:1 with the page display surface. A stroke only lives as a point
//! list while the pointer is down; once ended it exists solely as pixels, so
//! a page or zoom change (which resizes and wipes the surface) discards it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::trace;

use crate::viewer::{AnnotationSurface, InkColor};

pub const MIN_PEN_WIDTH: u8 = 1;
pub const MAX_PEN_WIDTH: u8 = 12;
pub const DEFAULT_PEN_WIDTH: u8 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown pen color: {0}")]
pub struct UnknownColor(pub String);

/// The fixed pen palette offered by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PenColor {
    #[default]
    Red,
    Blue,
    Green,
    Amber,
    Purple,
    Black,
}

impl PenColor {
    pub const PALETTE: [PenColor; 6] = [
        PenColor::Red,
        PenColor::Blue,
        PenColor::Green,
        PenColor::Amber,
        PenColor::Purple,
        PenColor::Black,
    ];

    pub fn hex(self) -> &'static str {
        match self {
            PenColor::Red => "#ff4d4f",
            PenColor::Blue => "#1677ff",
            PenColor::Green => "#52c41a",
            PenColor::Amber => "#faad14",
            PenColor::Purple => "#722ed1",
            PenColor::Black => "#000000",
        }
    }

    pub fn from_hex(value: &str) -> Result<Self, UnknownColor> {
        Self::PALETTE
            .into_iter()
            .find(|color| color.hex().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownColor(value.to_string()))
    }

    pub fn ink(self) -> InkColor {
        let hex = &self.hex()[1..];
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        InkColor { r: channel(0), g: channel(2), b: channel(4), a: 255 }
    }
}

impl fmt::Display for PenColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hex())
    }
}

impl TryFrom<String> for PenColor {
    type Error = UnknownColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<PenColor> for String {
    fn from(color: PenColor) -> Self {
        color.hex().to_string()
    }
}

/// Session-wide pen settings, read when a stroke begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenConfig {
    pub color: PenColor,
    pub width: u8,
}

impl Default for PenConfig {
    fn default() -> Self {
        Self { color: PenColor::default(), width: DEFAULT_PEN_WIDTH }
    }
}

impl PenConfig {
    /// Store `width` clamped to the slider range.
    pub fn set_width(&mut self, width: u8) {
        self.width = width.clamp(MIN_PEN_WIDTH, MAX_PEN_WIDTH);
    }

    pub fn set_color(&mut self, color: PenColor) {
        self.color = color;
    }

    fn style(&self) -> StrokeStyle {
        StrokeStyle { color: self.color, width: self.width.clamp(MIN_PEN_WIDTH, MAX_PEN_WIDTH) }
    }
}

/// A point in surface-local pixels (origin at the surface's top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f32,
    pub y: f32,
}

impl SurfacePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Pen style latched at stroke start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeStyle {
    pub color: PenColor,
    pub width: u8,
}

#[derive(Debug, Clone)]
struct LiveStroke {
    style: StrokeStyle,
    points: Vec<SurfacePoint>,
}

impl LiveStroke {
    fn last(&self) -> SurfacePoint {
        // never empty: created with the starting point
        self.points[self.points.len() - 1]
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationOverlay {
    surface: AnnotationSurface,
    live: Option<LiveStroke>,
}

impl AnnotationOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self { surface: AnnotationSurface::new(width, height), live: None }
    }

    pub fn surface(&self) -> &AnnotationSurface {
        &self.surface
    }

    pub fn is_drawing(&self) -> bool {
        self.live.is_some()
    }

    /// Start a stroke at `point`. An unfinished stroke is implicitly ended.
    pub fn begin_stroke(&mut self, point: SurfacePoint, pen: &PenConfig) {
        let style = pen.style();
        trace!(x = point.x, y = point.y, color = %style.color, width = style.width, "stroke begin");
        self.live = Some(LiveStroke { style, points: vec![point] });
    }

    /// Paint a segment from the previous point to `point`. Returns whether a
    /// segment was painted; without an active stroke this is a no-op.
    pub fn extend_stroke(&mut self, point: SurfacePoint) -> bool {
        let Some(live) = self.live.as_mut() else {
            return false;
        };

        let from = live.last();
        live.points.push(point);
        self.surface.stroke_segment(
            (from.x, from.y),
            (point.x, point.y),
            live.style.color.ink(),
            f32::from(live.style.width),
        )
    }

    /// Close the active stroke. Returns the number of recorded points, or
    /// `None` when no stroke was active.
    pub fn end_stroke(&mut self) -> Option<usize> {
        let live = self.live.take()?;
        trace!(points = live.points.len(), "stroke end");
        Some(live.points.len())
    }

    /// Wipe all ink. An active stroke keeps going from its last point.
    pub fn clear(&mut self) {
        self.surface.clear();
    }

    /// Match the display surface after a render. Abandons any live stroke.
    pub fn resize_and_clear(&mut self, width: u32, height: u32) {
        if self.live.take().is_some() {
            trace!("live stroke abandoned by surface resize");
        }
        self.surface.resize_and_clear(width, height);
    }
}
