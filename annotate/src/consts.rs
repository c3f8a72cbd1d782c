//! Shared numeric constants for the annotation crate.

// ── Hit-testing ─────────────────────────────────────────────────

/// Pixel tolerance around each of the eight rectangle resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Maximum distance from a freehand stroke that still counts as a hit.
pub const FREEHAND_HIT_PX: f64 = 10.0;

// ── Editing ─────────────────────────────────────────────────────

/// Offset applied on both axes to duplicated and pasted annotations.
pub const DUPLICATE_OFFSET_PX: f64 = 20.0;

/// Text drafts smaller than this on either axis are discarded on release.
pub const MIN_TEXT_BOX_PX: f64 = 20.0;

/// Smallest width/height a rectangle can be resized down to.
pub const MIN_RESIZE_PX: f64 = 10.0;

/// Stroke color used for new annotations until the host picks another.
pub const DEFAULT_COLOR: &str = "#ff0000";
