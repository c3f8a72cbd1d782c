//! Input model: tools, pointer events, and the gesture state machine.
//!
//! `Tool` captures what pointer input means right now. `PointerEvent` is the
//! host's raw event reduced to image coordinates plus a modifier flag.
//! `InputState` is the active gesture tracked between pointer-down and
//! pointer-up, carrying everything needed to compute incremental deltas and
//! commit on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_COLOR;
use crate::doc::{Annotation, AnnotationId, AnnotationKind};
use crate::geometry::{BoxRect, Point};
use crate::hit::ResizeAnchor;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    Rectangle,
    Circle,
    Polygon,
    Freehand,
    Text,
}

impl Tool {
    /// The annotation kind this tool draws, or `None` for the select tool.
    #[must_use]
    pub fn kind(self) -> Option<AnnotationKind> {
        match self {
            Self::Select => None,
            Self::Rectangle => Some(AnnotationKind::Rectangle),
            Self::Circle => Some(AnnotationKind::Circle),
            Self::Polygon => Some(AnnotationKind::Polygon),
            Self::Freehand => Some(AnnotationKind::Freehand),
            Self::Text => Some(AnnotationKind::Text),
        }
    }
}

/// Pointer event reduced to image coordinates.
///
/// `modifier` is the "extend selection" signal (Shift on desktop).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    #[serde(default, rename = "modifierPressed")]
    pub modifier: bool,
}

impl PointerEvent {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, modifier: false }
    }

    #[must_use]
    pub fn with_modifier(x: f64, y: f64) -> Self {
        Self { x, y, modifier: true }
    }

    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Where the host should open its text editor for a pending text annotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextPrompt {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<BoxRect> for TextPrompt {
    fn from(b: BoxRect) -> Self {
        Self { x: b.x, y: b.y, width: b.width, height: b.height }
    }
}

/// Persistent UI state that outlives individual gestures.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// Color applied to newly drawn annotations.
    pub color: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self { tool: Tool::Select, color: DEFAULT_COLOR.to_string() }
    }
}

/// Coarse state name, for hosts that only need to switch cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Drawing,
    Dragging,
    Resizing,
    TextEditing,
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A new annotation is being drawn.
    Drawing {
        /// Pointer position at pointer-down; the fixed corner or center.
        anchor: Point,
        /// Provisional annotation, not yet in the list.
        draft: Annotation,
    },
    /// The selection is being moved.
    Dragging {
        /// Pointer position at the previous event, for incremental deltas.
        last: Point,
        /// Whether any move event arrived since pointer-down.
        moved: bool,
    },
    /// A rectangle is being resized by one of its handles.
    Resizing {
        /// Annotation being resized.
        id: AnnotationId,
        /// Handle being dragged.
        handle: ResizeAnchor,
        /// Position of the opposite handle; stays fixed.
        anchor: Point,
        /// Box at pointer-down, for the axes the handle doesn't move.
        orig: BoxRect,
        /// Whether any move event arrived since pointer-down.
        moved: bool,
    },
    /// A text box was drawn and the host is collecting its text.
    TextEditing {
        /// Provisional text annotation awaiting its content.
        draft: Annotation,
    },
}

impl InputState {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Drawing { .. } => Phase::Drawing,
            Self::Dragging { .. } => Phase::Dragging,
            Self::Resizing { .. } => Phase::Resizing,
            Self::TextEditing { .. } => Phase::TextEditing,
        }
    }

    /// The provisional annotation, while drawing or awaiting text.
    #[must_use]
    pub fn draft(&self) -> Option<&Annotation> {
        match self {
            Self::Drawing { draft, .. } | Self::TextEditing { draft } => Some(draft),
            _ => None,
        }
    }
}
