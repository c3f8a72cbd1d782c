//! Document model: annotations, their coordinate payloads, and sparse patches.
//!
//! This module defines what sits on the image (`Annotation`, `AnnotationKind`,
//! `Coordinates`), a sparse-update type for property edits (`AnnotationPatch`),
//! and the validation that keeps a coordinate payload consistent with its
//! kind. The wire shape is the camelCase JSON the persistence API speaks:
//! `type` names the kind and `coordinates` holds a kind-specific object.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BoxRect, Point};

/// Opaque annotation identifier. Locally created annotations use UUID v4 text;
/// annotations loaded from a backend may carry any string.
pub type AnnotationId = String;

/// Fresh identifier for a locally created annotation or version.
#[must_use]
pub fn new_id() -> AnnotationId {
    Uuid::new_v4().to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("{kind} annotation needs {expected} coordinates")]
    KindMismatch { kind: AnnotationKind, expected: &'static str },
    #[error("malformed {kind} coordinates: {reason}")]
    Malformed { kind: AnnotationKind, reason: &'static str },
    #[error("invalid annotation JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The kind of an annotation. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Rectangle,
    Circle,
    Polygon,
    Freehand,
    Text,
}

impl AnnotationKind {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Polygon => "polygon",
            Self::Freehand => "freehand",
            Self::Text => "text",
        }
    }

    /// Polygon and freehand store an ordered point list.
    #[must_use]
    pub fn is_path(self) -> bool {
        matches!(self, Self::Polygon | Self::Freehand)
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific geometry payload.
///
/// Deserialization is shape-driven (`untagged`); `Text` is listed before
/// `Rect` so a payload carrying `text` is not silently read as a rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    /// Text box: bounding box plus the text content.
    Text { x: f64, y: f64, width: f64, height: f64, text: String },
    /// Rectangle bounding box.
    Rect { x: f64, y: f64, width: f64, height: f64 },
    /// Circle by center and radius.
    Circle { x: f64, y: f64, radius: f64 },
    /// Ordered point list for polygons and freehand strokes.
    Path { points: Vec<Point> },
}

impl Coordinates {
    /// Check that this payload has the shape `kind` requires and carries only
    /// finite, non-negative sizes.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::KindMismatch`] when the shape is wrong for
    /// `kind`, or [`AnnotationError::Malformed`] for non-finite values,
    /// negative sizes, or an empty point list.
    pub fn validate(&self, kind: AnnotationKind) -> Result<(), AnnotationError> {
        let malformed = |reason| AnnotationError::Malformed { kind, reason };
        match (kind, self) {
            (AnnotationKind::Rectangle, Self::Rect { x, y, width, height })
            | (AnnotationKind::Text, Self::Text { x, y, width, height, .. }) => {
                if ![x, y, width, height].iter().all(|v| v.is_finite()) {
                    return Err(malformed("non-finite value"));
                }
                if *width < 0.0 || *height < 0.0 {
                    return Err(malformed("negative size"));
                }
                Ok(())
            }
            (AnnotationKind::Circle, Self::Circle { x, y, radius }) => {
                if ![x, y, radius].iter().all(|v| v.is_finite()) {
                    return Err(malformed("non-finite value"));
                }
                if *radius < 0.0 {
                    return Err(malformed("negative radius"));
                }
                Ok(())
            }
            (AnnotationKind::Polygon | AnnotationKind::Freehand, Self::Path { points }) => {
                if points.is_empty() {
                    return Err(malformed("empty point list"));
                }
                if !points.iter().all(|p| p.is_finite()) {
                    return Err(malformed("non-finite point"));
                }
                Ok(())
            }
            _ => Err(AnnotationError::KindMismatch { kind, expected: expected_shape(kind) }),
        }
    }

    /// Bounding box for box-shaped payloads (rectangle and text).
    #[must_use]
    pub fn bbox(&self) -> Option<BoxRect> {
        match *self {
            Self::Rect { x, y, width, height } | Self::Text { x, y, width, height, .. } => {
                Some(BoxRect { x, y, width, height })
            }
            _ => None,
        }
    }

    /// Shift every position by `(dx, dy)` without clamping.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Rect { x, y, .. } | Self::Text { x, y, .. } | Self::Circle { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Self::Path { points } => {
                for p in points {
                    p.x += dx;
                    p.y += dy;
                }
            }
        }
    }

    /// Overwrite the box of a rectangle or text payload. Other shapes are untouched.
    pub fn set_bbox(&mut self, b: BoxRect) {
        match self {
            Self::Rect { x, y, width, height } | Self::Text { x, y, width, height, .. } => {
                *x = b.x;
                *y = b.y;
                *width = b.width;
                *height = b.height;
            }
            Self::Circle { .. } | Self::Path { .. } => {}
        }
    }
}

fn expected_shape(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Rectangle => "{x, y, width, height}",
        AnnotationKind::Text => "{x, y, width, height, text}",
        AnnotationKind::Circle => "{x, y, radius}",
        AnnotationKind::Polygon | AnnotationKind::Freehand => "{points}",
    }
}

/// A single markup object placed on a case image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub case_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub coordinates: Coordinates,
    pub color: String,
    /// Display text for shapes. Text annotations use `coordinates.text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Annotation {
    /// Absent `locked` means unlocked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    /// Absent `visible` means visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    /// Validate the coordinate payload against the kind.
    ///
    /// # Errors
    ///
    /// See [`Coordinates::validate`].
    pub fn validate(&self) -> Result<(), AnnotationError> {
        self.coordinates.validate(self.kind)
    }

    /// Parse and validate a JSON annotation list as produced by the persistence API.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::Json`] on decode failure, or the first
    /// validation error encountered.
    pub fn list_from_json(json: &str) -> Result<Vec<Annotation>, AnnotationError> {
        let list: Vec<Annotation> = serde_json::from_str(json)?;
        for ann in &list {
            ann.validate()?;
        }
        Ok(list)
    }
}

/// Fields supplied by the caller when creating an annotation. The store
/// assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub case_id: String,
    pub user_id: String,
    pub kind: AnnotationKind,
    pub coordinates: Coordinates,
    pub color: String,
    pub label: Option<String>,
}

/// Sparse update for an annotation. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// `Some(None)` clears the label; JSON `null` maps to it.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// A field that is present (even as `null`) deserializes to `Some(..)`.
fn present<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

impl AnnotationPatch {
    /// Merge into `ann`. Coordinates that don't fit the annotation's kind are
    /// rejected and nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns the coordinate validation error, leaving `ann` untouched.
    pub fn apply_to(&self, ann: &mut Annotation) -> Result<(), AnnotationError> {
        if let Some(coords) = &self.coordinates {
            coords.validate(ann.kind)?;
            ann.coordinates = coords.clone();
        }
        if let Some(color) = &self.color {
            ann.color.clone_from(color);
        }
        if let Some(label) = &self.label {
            ann.label.clone_from(label);
        }
        if let Some(locked) = self.locked {
            ann.locked = Some(locked);
        }
        if let Some(visible) = self.visible {
            ann.visible = Some(visible);
        }
        Ok(())
    }
}
