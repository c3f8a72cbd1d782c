//! Plain geometry shared by hit-testing, drawing, and clamping.
//!
//! All coordinates are in rendered image pixels with the origin at the image's
//! top-left corner. Nothing here knows about annotations.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// A point in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Both components are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Rendered size of the backing image. Defines the valid coordinate range
/// `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub width: f64,
    pub height: f64,
}

impl ImageBounds {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp the origin of a `w` x `h` box so the whole box stays inside.
    ///
    /// A box larger than the image on some axis is pinned to 0 on that axis.
    #[must_use]
    pub fn clamp_box_origin(&self, x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
        (clamp_span_start(x, w, self.width), clamp_span_start(y, h, self.height))
    }

    /// Clamp a circle center so the full disc stays inside.
    #[must_use]
    pub fn clamp_circle_center(&self, cx: f64, cy: f64, radius: f64) -> (f64, f64) {
        (
            clamp_span_start(cx - radius, radius * 2.0, self.width) + radius,
            clamp_span_start(cy - radius, radius * 2.0, self.height) + radius,
        )
    }
}

fn clamp_span_start(start: f64, len: f64, limit: f64) -> f64 {
    let max = (limit - len).max(0.0);
    start.clamp(0.0, max)
}

/// An axis-aligned box with non-negative size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRect {
    /// Normalized box spanned by two corners, regardless of drag direction.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Closed containment: points on the border count as inside.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Distance from `p` to the closest point of segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Span from `anchor` toward `pointer` on one axis, at least `min` long.
///
/// When the pointer is closer than `min` the span grows away from the anchor
/// in the pointer's direction. Returns `(start, len)`.
#[must_use]
pub fn span_with_min(anchor: f64, pointer: f64, min: f64) -> (f64, f64) {
    let len = (pointer - anchor).abs();
    if len >= min {
        (anchor.min(pointer), len)
    } else if pointer >= anchor {
        (anchor, min)
    } else {
        (anchor - min, min)
    }
}

/// Clip a `(start, len)` span to `[0, limit]`, then re-grow it inside the
/// limit if clipping left it shorter than `min`.
#[must_use]
pub fn clip_span(start: f64, len: f64, limit: f64, min: f64) -> (f64, f64) {
    let limit = limit.max(0.0);
    let mut lo = start.clamp(0.0, limit);
    let mut hi = (start + len).clamp(0.0, limit);
    if hi - lo < min {
        if lo + min <= limit {
            hi = lo + min;
        } else {
            lo = (hi - min).max(0.0);
            hi = (lo + min).min(limit);
        }
    }
    (lo, hi - lo)
}
