//! Hit-testing: which annotation is under a point, and which resize handle.
//!
//! Everything here is a pure function of its inputs.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use serde::{Deserialize, Serialize};

use crate::consts::{FREEHAND_HIT_PX, HANDLE_RADIUS_PX};
use crate::doc::{Annotation, AnnotationId, AnnotationKind, Coordinates};
use crate::geometry::{BoxRect, Point, distance_to_segment};

/// Resize handle on a rectangle's bounding box, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    /// Order in which handles are tested. Corners win over edge midpoints.
    pub const ALL: [ResizeAnchor; 8] = [
        ResizeAnchor::Nw,
        ResizeAnchor::Ne,
        ResizeAnchor::Se,
        ResizeAnchor::Sw,
        ResizeAnchor::N,
        ResizeAnchor::E,
        ResizeAnchor::S,
        ResizeAnchor::W,
    ];

    /// The handle on the far side of the box.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::N => Self::S,
            Self::Ne => Self::Sw,
            Self::E => Self::W,
            Self::Se => Self::Nw,
            Self::S => Self::N,
            Self::Sw => Self::Ne,
            Self::W => Self::E,
            Self::Nw => Self::Se,
        }
    }

    /// Whether dragging this handle changes the box width.
    #[must_use]
    pub fn moves_x(self) -> bool {
        !matches!(self, Self::N | Self::S)
    }

    /// Whether dragging this handle changes the box height.
    #[must_use]
    pub fn moves_y(self) -> bool {
        !matches!(self, Self::E | Self::W)
    }

    /// Position of this handle on `b`.
    #[must_use]
    pub fn position(self, b: &BoxRect) -> Point {
        let cx = b.x + b.width / 2.0;
        let cy = b.y + b.height / 2.0;
        match self {
            Self::N => Point::new(cx, b.y),
            Self::Ne => Point::new(b.right(), b.y),
            Self::E => Point::new(b.right(), cy),
            Self::Se => Point::new(b.right(), b.bottom()),
            Self::S => Point::new(cx, b.bottom()),
            Self::Sw => Point::new(b.x, b.bottom()),
            Self::W => Point::new(b.x, cy),
            Self::Nw => Point::new(b.x, b.y),
        }
    }
}

/// Whether `p` lies on `ann`. Hidden annotations never hit.
///
/// - rectangle/text: closed box containment.
/// - circle: distance to center at most the radius.
/// - polygon: even-odd ray casting; a point exactly on an edge resolves by
///   the half-open crossing rule, so the answer is deterministic.
/// - freehand: within [`FREEHAND_HIT_PX`] of any segment or of the final point.
#[must_use]
pub fn point_in_shape(p: Point, ann: &Annotation) -> bool {
    if !ann.is_visible() {
        return false;
    }
    match (&ann.kind, &ann.coordinates) {
        (AnnotationKind::Rectangle | AnnotationKind::Text, coords) => {
            coords.bbox().is_some_and(|b| b.contains(p))
        }
        (AnnotationKind::Circle, Coordinates::Circle { x, y, radius }) => p.distance(Point::new(*x, *y)) <= *radius,
        (AnnotationKind::Polygon, Coordinates::Path { points }) => point_in_polygon(p, points),
        (AnnotationKind::Freehand, Coordinates::Path { points }) => point_near_stroke(p, points),
        _ => false,
    }
}

fn point_in_polygon(p: Point, points: &[Point]) -> bool {
    let mut inside = false;
    let Some(mut prev) = points.last().copied() else {
        return false;
    };
    for &cur in points {
        if (cur.y > p.y) != (prev.y > p.y) {
            let cross_x = (prev.x - cur.x) * (p.y - cur.y) / (prev.y - cur.y) + cur.x;
            if p.x < cross_x {
                inside = !inside;
            }
        }
        prev = cur;
    }
    inside
}

fn point_near_stroke(p: Point, points: &[Point]) -> bool {
    let Some(last) = points.last() else {
        return false;
    };
    if p.distance(*last) <= FREEHAND_HIT_PX {
        return true;
    }
    points
        .windows(2)
        .any(|w| distance_to_segment(p, w[0], w[1]) <= FREEHAND_HIT_PX)
}

/// Resize handle of a rectangle within [`HANDLE_RADIUS_PX`] of `p`.
///
/// Only rectangles have handles; every other kind returns `None`.
#[must_use]
pub fn resize_handle_at(p: Point, ann: &Annotation) -> Option<ResizeAnchor> {
    if ann.kind != AnnotationKind::Rectangle {
        return None;
    }
    let b = ann.coordinates.bbox()?;
    ResizeAnchor::ALL
        .into_iter()
        .find(|h| h.position(&b).distance(p) <= HANDLE_RADIUS_PX)
}

/// Topmost annotation under `p`. Later entries are drawn above earlier ones.
#[must_use]
pub fn topmost_hit<'a>(p: Point, annotations: &'a [Annotation]) -> Option<&'a AnnotationId> {
    annotations
        .iter()
        .rev()
        .find(|ann| point_in_shape(p, ann))
        .map(|ann| &ann.id)
}
