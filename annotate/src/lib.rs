//! Annotation engine for medical-image markup.
//!
//! This crate owns the editable state behind a single annotation canvas laid
//! over a raster image: the annotation list, selection, in-progress drafts,
//! clipboard, undo/redo history, per-annotation versions, and read-only peer
//! overlays. The host UI layer forwards pointer events to [`engine::Engine`]
//! and paints whatever [`engine::Engine::view`] reports; persistence and
//! network access live outside this crate.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine: pointer handlers and the public editing API |
//! | [`doc`] | Annotation model, coordinate payloads, and sparse patches |
//! | [`store`] | Annotation list, selection, clipboard, and history bookkeeping |
//! | [`history`] | Linear snapshot-based undo/redo stack |
//! | [`version`] | Per-annotation version log with restore, preview, and renumbering |
//! | [`peers`] | Keyed peer overlay map |
//! | [`input`] | Tools, pointer events, and the gesture state machine |
//! | [`hit`] | Hit-testing and resize-handle detection |
//! | [`geometry`] | Points, image bounds, and box arithmetic |
//! | [`consts`] | Shared numeric constants (tolerances, offsets, minimum sizes) |

pub mod consts;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod input;
pub mod peers;
pub mod store;
pub mod version;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
