//! Pointer events to overlay calls.
//!
//! The overlay itself knows nothing about event delivery. The shell forwards
//! raw pointer events here together with something that can report where the
//! annotation surface currently sits on screen.

use serde::{Deserialize, Serialize};

use crate::annotations::{AnnotationOverlay, PenConfig, SurfacePoint};

/// A point in client (window) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientPoint {
    pub x: f32,
    pub y: f32,
}

impl ClientPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Reports the on-screen top-left of the annotation surface.
///
/// Queried on every event: scrolling or a layout shift can move the surface
/// between two pointer events.
pub trait SurfaceLayout {
    fn surface_origin(&self) -> ClientPoint;
}

/// A layout whose surface never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLayout(pub ClientPoint);

impl SurfaceLayout for FixedLayout {
    fn surface_origin(&self) -> ClientPoint {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub client: ClientPoint,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f32, y: f32) -> Self {
        Self { kind, client: ClientPoint::new(x, y) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    StrokeStarted,
    SegmentPainted,
    StrokeEnded,
    Ignored,
}

#[inline]
pub fn to_surface_point(client: ClientPoint, layout: &dyn SurfaceLayout) -> SurfacePoint {
    let origin = layout.surface_origin();
    SurfacePoint::new(client.x - origin.x, client.y - origin.y)
}

/// Route one pointer event to the overlay. Both pointer-up and leaving the
/// surface end the stroke, since a drag can exit without a pointer-up.
pub fn dispatch_pointer(
    overlay: &mut AnnotationOverlay,
    event: PointerEvent,
    layout: &dyn SurfaceLayout,
    pen: &PenConfig,
) -> PointerOutcome {
    match event.kind {
        PointerKind::Down => {
            overlay.begin_stroke(to_surface_point(event.client, layout), pen);
            PointerOutcome::StrokeStarted
        }
        PointerKind::Move => {
            if overlay.extend_stroke(to_surface_point(event.client, layout)) {
                PointerOutcome::SegmentPainted
            } else {
                PointerOutcome::Ignored
            }
        }
        PointerKind::Up | PointerKind::Leave => match overlay.end_stroke() {
            Some(_) => PointerOutcome::StrokeEnded,
            None => PointerOutcome::Ignored,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Surface that scrolls by `step` pixels every time it is asked.
    struct ScrollingLayout {
        top: Cell<f32>,
        step: f32,
    }

    impl SurfaceLayout for ScrollingLayout {
        fn surface_origin(&self) -> ClientPoint {
            let top = self.top.get();
            self.top.set(top - self.step);
            ClientPoint::new(100.0, top)
        }
    }

    #[test]
    fn client_points_are_offset_by_surface_origin() {
        let layout = FixedLayout(ClientPoint::new(240.0, 64.0));
        let point = to_surface_point(ClientPoint::new(250.5, 70.0), &layout);
        assert_eq!(point, SurfacePoint::new(10.5, 6.0));
    }

    #[test]
    fn origin_is_recomputed_for_every_event() {
        let layout = ScrollingLayout { top: Cell::new(50.0), step: 20.0 };
        let first = to_surface_point(ClientPoint::new(110.0, 80.0), &layout);
        let second = to_surface_point(ClientPoint::new(110.0, 80.0), &layout);

        assert_eq!(first, SurfacePoint::new(10.0, 30.0));
        assert_eq!(second, SurfacePoint::new(10.0, 50.0));
    }

    #[test]
    fn down_move_up_draws_and_ends() {
        let mut overlay = AnnotationOverlay::new(100, 100);
        let layout = FixedLayout(ClientPoint::new(20.0, 20.0));
        let pen = PenConfig::default();

        let events = [
            PointerEvent::new(PointerKind::Down, 30.0, 40.0),
            PointerEvent::new(PointerKind::Move, 60.0, 40.0),
            PointerEvent::new(PointerKind::Up, 60.0, 40.0),
        ];
        let outcomes: Vec<_> =
            events.into_iter().map(|e| dispatch_pointer(&mut overlay, e, &layout, &pen)).collect();

        assert_eq!(
            outcomes,
            vec![
                PointerOutcome::StrokeStarted,
                PointerOutcome::SegmentPainted,
                PointerOutcome::StrokeEnded
            ]
        );
        assert!(overlay.surface().alpha_at(25, 20) > 0);
    }

    #[test]
    fn leave_ends_stroke_and_later_moves_are_ignored() {
        let mut overlay = AnnotationOverlay::new(100, 100);
        let layout = FixedLayout(ClientPoint::new(0.0, 0.0));
        let pen = PenConfig::default();

        dispatch_pointer(&mut overlay, PointerEvent::new(PointerKind::Down, 5.0, 5.0), &layout, &pen);
        let left = PointerEvent::new(PointerKind::Leave, 99.0, 5.0);
        assert_eq!(dispatch_pointer(&mut overlay, left, &layout, &pen), PointerOutcome::StrokeEnded);

        let moved = PointerEvent::new(PointerKind::Move, 50.0, 50.0);
        assert_eq!(dispatch_pointer(&mut overlay, moved, &layout, &pen), PointerOutcome::Ignored);
        let up = PointerEvent::new(PointerKind::Up, 50.0, 50.0);
        assert_eq!(dispatch_pointer(&mut overlay, up, &layout, &pen), PointerOutcome::Ignored);
    }
}
