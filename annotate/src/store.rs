//! Annotation state store: the single source of truth for one case canvas.
//!
//! The store owns the annotation list (in z-order, last drawn on top), the
//! selection set, the clipboard, the undo/redo history, the version log, and
//! the peer overlay map. Every committing mutation updates the list and pushes
//! its history snapshot inside the same call, so observers never see one
//! without the other.
//!
//! ERROR HANDLING
//! ==============
//! Operations naming unknown ids or an empty selection are no-ops that log at
//! debug level and report what they touched (a count, a bool, or an empty
//! list). Only malformed coordinates are errors, and those are rejected before
//! anything is stored.
//!
//! Lock and visibility flags are cosmetic and deliberately skip history.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use tracing::debug;

use crate::consts::DUPLICATE_OFFSET_PX;
use crate::doc::{Annotation, AnnotationError, AnnotationId, AnnotationPatch, Coordinates, NewAnnotation, new_id};
use crate::geometry::{BoxRect, ImageBounds};
use crate::history::History;
use crate::now_ms;
use crate::peers::PeerOverlays;
use crate::version::{AnnotationVersion, VersionLog};

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    case_id: String,
    user_id: String,
    annotations: Vec<Annotation>,
    selection: Vec<AnnotationId>,
    clipboard: Vec<Annotation>,
    history: History,
    versions: VersionLog,
    peers: PeerOverlays,
}

impl AnnotationStore {
    #[must_use]
    pub fn new(case_id: &str, user_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            user_id: user_id.to_string(),
            annotations: Vec::new(),
            selection: Vec::new(),
            clipboard: Vec::new(),
            history: History::default(),
            versions: VersionLog::new(),
            peers: PeerOverlays::new(),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Annotations in draw order.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    #[must_use]
    pub fn selection(&self) -> &[AnnotationId] {
        &self.selection
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }

    /// The single selected annotation, if exactly one is selected.
    #[must_use]
    pub fn sole_selected(&self) -> Option<&Annotation> {
        match self.selection.as_slice() {
            [only] => self.get(only),
            _ => None,
        }
    }

    #[must_use]
    pub fn clipboard(&self) -> &[Annotation] {
        &self.clipboard
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn versions(&self) -> &VersionLog {
        &self.versions
    }

    #[must_use]
    pub fn peers(&self) -> &PeerOverlays {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut PeerOverlays {
        &mut self.peers
    }

    // --- Loading ---

    /// Replace the list with persisted annotations and reset history to it.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; the store is unchanged on error.
    pub fn load(&mut self, annotations: Vec<Annotation>) -> Result<(), AnnotationError> {
        for ann in &annotations {
            ann.validate()?;
        }
        self.history = History::new(annotations.clone());
        self.annotations = annotations;
        self.selection.clear();
        Ok(())
    }

    // --- History ---

    fn push_history(&mut self) {
        self.history.push(self.annotations.clone());
    }

    /// Snapshot the current list after an in-place gesture (drag, resize).
    ///
    /// Returns false, pushing nothing, when no geometry differs from the
    /// snapshot at the history cursor.
    pub fn commit_gesture(&mut self) -> bool {
        let before = self.history.current().iter().map(|a| (&a.id, &a.coordinates));
        if self.annotations.iter().map(|a| (&a.id, &a.coordinates)).eq(before) {
            debug!("gesture left geometry unchanged; no history entry");
            return false;
        }
        self.push_history();
        true
    }

    /// Move the history cursor back one step and restore that list.
    /// Clears the selection. Returns false at the start of history.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            debug!("undo at start of history ignored");
            return false;
        };
        self.annotations = snapshot.to_vec();
        self.selection.clear();
        true
    }

    /// Move the history cursor forward one step and restore that list.
    /// Clears the selection. Returns false at the end of history.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            debug!("redo at end of history ignored");
            return false;
        };
        self.annotations = snapshot.to_vec();
        self.selection.clear();
        true
    }

    // --- Create / update / delete ---

    /// Validate, assign an id and timestamps, append, and push history.
    ///
    /// # Errors
    ///
    /// Rejects coordinates that don't match the kind or carry non-finite values.
    pub fn create_annotation(&mut self, new: NewAnnotation) -> Result<Annotation, AnnotationError> {
        new.coordinates.validate(new.kind)?;
        let now = now_ms();
        let ann = Annotation {
            id: new_id(),
            case_id: new.case_id,
            user_id: new.user_id,
            kind: new.kind,
            coordinates: new.coordinates,
            color: new.color,
            label: new.label,
            locked: None,
            visible: Some(true),
            created_at: now,
            updated_at: now,
        };
        self.annotations.push(ann.clone());
        self.push_history();
        Ok(ann)
    }

    /// Append a finished draft produced by the interaction controller.
    ///
    /// # Errors
    ///
    /// Rejects drafts whose coordinates fail validation.
    pub fn commit_draft(&mut self, mut draft: Annotation) -> Result<Annotation, AnnotationError> {
        draft.validate()?;
        let now = now_ms();
        draft.created_at = now;
        draft.updated_at = now;
        self.annotations.push(draft.clone());
        self.push_history();
        Ok(draft)
    }

    /// Merge `patch` into the annotation with `id` and push history.
    ///
    /// Unknown ids are a silent no-op reported as `Ok(false)`. A patch that
    /// changes nothing still reports `Ok(true)` but pushes no history.
    ///
    /// # Errors
    ///
    /// Rejects patch coordinates that don't fit the annotation's kind.
    pub fn update_annotation(&mut self, id: &str, patch: &AnnotationPatch) -> Result<bool, AnnotationError> {
        let Some(ann) = self.get_mut(id) else {
            debug!(%id, "update of unknown annotation ignored");
            return Ok(false);
        };
        let before = ann.clone();
        patch.apply_to(ann)?;
        if *ann == before {
            debug!(%id, "update changed nothing; no history entry");
            return Ok(true);
        }
        ann.updated_at = now_ms();
        self.push_history();
        Ok(true)
    }

    /// Remove every annotation whose id is in `ids`, drop them from the
    /// selection, and push history. Returns how many were removed.
    pub fn delete_annotations(&mut self, ids: &[AnnotationId]) -> usize {
        let before = self.annotations.len();
        self.annotations.retain(|a| !ids.contains(&a.id));
        let removed = before - self.annotations.len();
        if removed == 0 {
            debug!(requested = ids.len(), "delete matched no annotations");
            return 0;
        }
        self.selection.retain(|id| !ids.contains(id));
        self.push_history();
        removed
    }

    /// Delete whatever is selected.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selection.clone();
        self.delete_annotations(&ids)
    }

    /// Copy each matched annotation under a new id, offset by
    /// [`DUPLICATE_OFFSET_PX`] on both axes, and push history.
    pub fn duplicate_annotations(&mut self, ids: &[AnnotationId]) -> Vec<AnnotationId> {
        let now = now_ms();
        let copies: Vec<Annotation> = self
            .annotations
            .iter()
            .filter(|a| ids.contains(&a.id))
            .map(|a| offset_copy(a, now))
            .collect();
        if copies.is_empty() {
            debug!(requested = ids.len(), "duplicate matched no annotations");
            return Vec::new();
        }
        let new_ids = copies.iter().map(|a| a.id.clone()).collect();
        self.annotations.extend(copies);
        self.push_history();
        new_ids
    }

    // --- Cosmetic flags (no history) ---

    /// Set `locked` on each matched annotation. Returns how many matched.
    pub fn lock_annotations(&mut self, ids: &[AnnotationId], locked: bool) -> usize {
        self.set_flag(ids, |a| a.locked = Some(locked))
    }

    /// Set `visible` on each matched annotation. Returns how many matched.
    pub fn toggle_visibility(&mut self, ids: &[AnnotationId], visible: bool) -> usize {
        self.set_flag(ids, |a| a.visible = Some(visible))
    }

    fn set_flag(&mut self, ids: &[AnnotationId], mut set: impl FnMut(&mut Annotation)) -> usize {
        let mut touched = 0;
        for ann in self.annotations.iter_mut().filter(|a| ids.contains(&a.id)) {
            set(ann);
            touched += 1;
        }
        if touched == 0 {
            debug!(requested = ids.len(), "flag change matched no annotations");
        }
        touched
    }

    // --- Clipboard ---

    /// Snapshot the matched annotations into the clipboard. An empty match
    /// leaves the clipboard as it was. Returns how many were copied.
    pub fn copy(&mut self, ids: &[AnnotationId]) -> usize {
        let copied: Vec<Annotation> = self.annotations.iter().filter(|a| ids.contains(&a.id)).cloned().collect();
        if copied.is_empty() {
            debug!("copy with nothing selected ignored");
            return 0;
        }
        let count = copied.len();
        self.clipboard = copied;
        count
    }

    /// Insert clipboard copies under new ids with the duplicate offset, select
    /// them, and push history.
    pub fn paste(&mut self) -> Vec<AnnotationId> {
        if self.clipboard.is_empty() {
            debug!("paste with empty clipboard ignored");
            return Vec::new();
        }
        let now = now_ms();
        let pasted: Vec<Annotation> = self.clipboard.iter().map(|a| offset_copy(a, now)).collect();
        let new_ids: Vec<AnnotationId> = pasted.iter().map(|a| a.id.clone()).collect();
        self.annotations.extend(pasted);
        self.selection.clone_from(&new_ids);
        self.push_history();
        new_ids
    }

    // --- Selection ---

    /// Replace the selection, dropping unknown and duplicate ids.
    pub fn select(&mut self, ids: &[AnnotationId]) {
        self.selection.clear();
        for id in ids {
            if self.get(id).is_some() && !self.is_selected(id) {
                self.selection.push(id.clone());
            }
        }
    }

    /// Add `id` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle_selected(&mut self, id: &str) -> bool {
        if self.is_selected(id) {
            self.selection.retain(|s| s != id);
            return false;
        }
        if self.get(id).is_none() {
            return false;
        }
        self.selection.push(id.to_string());
        true
    }

    pub fn select_all(&mut self) {
        self.selection = self.annotations.iter().map(|a| a.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- In-place gesture edits (history is pushed by `commit_gesture`) ---

    /// Translate every selected, unlocked annotation by `(dx, dy)`.
    ///
    /// Rectangles, text boxes, and circles are clamped to stay inside
    /// `bounds`; polygon and freehand points move freely. Returns how many
    /// annotations moved.
    pub fn translate_selected(&mut self, dx: f64, dy: f64, bounds: Option<ImageBounds>) -> usize {
        let now = now_ms();
        let mut moved = 0;
        for ann in self.annotations.iter_mut() {
            if ann.is_locked() || !self.selection.contains(&ann.id) {
                continue;
            }
            let before = ann.coordinates.clone();
            ann.coordinates.translate(dx, dy);
            if let Some(bounds) = bounds {
                clamp_into(&mut ann.coordinates, bounds);
            }
            if ann.coordinates != before {
                ann.updated_at = now;
                moved += 1;
            }
        }
        moved
    }

    /// Overwrite the box of a rectangle or text annotation. Returns true only
    /// if the box changed.
    pub fn set_box(&mut self, id: &str, b: BoxRect) -> bool {
        let Some(ann) = self.get_mut(id) else {
            return false;
        };
        if ann.coordinates.bbox() == Some(b) {
            return false;
        }
        ann.coordinates.set_bbox(b);
        ann.updated_at = now_ms();
        true
    }

    // --- Versions ---

    /// Snapshot an annotation as its lineage's next version.
    pub fn save_version(&mut self, annotation_id: &str, description: Option<String>) -> Option<AnnotationVersion> {
        let Some(ann) = self.annotations.iter().find(|a| a.id == annotation_id) else {
            debug!(%annotation_id, "save_version for unknown annotation ignored");
            return None;
        };
        Some(self.versions.save(ann, &self.user_id, description).clone())
    }

    /// Apply a version to the live list (see [`VersionLog::reconstruct`]),
    /// recreating the annotation if it no longer exists, and push history.
    pub fn restore_version(&mut self, version_id: &str) -> Option<AnnotationId> {
        let Some(target) = self.versions.get(version_id) else {
            debug!(%version_id, "restore of unknown version ignored");
            return None;
        };
        let number = target.version;
        let live = self.get(&target.annotation_id);
        let restored = self.versions.reconstruct(version_id, live, &self.case_id)?;
        let id = restored.id.clone();
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(slot) => *slot = restored,
            None => {
                debug!(%id, "restoring deleted annotation from version record");
                self.annotations.push(restored);
            }
        }
        self.versions.set_current_version(number);
        self.versions.clear_overlay();
        self.push_history();
        Some(id)
    }

    /// Put a reconstructed version in the overlay slot without touching the list.
    pub fn preview_version(&mut self, version_id: &str) -> bool {
        let live = self
            .versions
            .get(version_id)
            .and_then(|v| self.annotations.iter().find(|a| a.id == v.annotation_id));
        let Some(preview) = self.versions.reconstruct(version_id, live, &self.case_id) else {
            debug!(%version_id, "preview of unknown version ignored");
            return false;
        };
        self.versions.set_overlay(preview);
        true
    }

    pub fn clear_version_overlay(&mut self) {
        self.versions.clear_overlay();
    }

    pub fn delete_version(&mut self, version_id: &str) -> bool {
        self.versions.delete(version_id)
    }

    /// Replace the version log outright.
    pub fn set_versions(&mut self, versions: Vec<AnnotationVersion>) {
        self.versions.replace_all(versions);
    }

    /// Merge a version list pushed from the backend; see [`VersionLog::merge_remote`].
    pub fn merge_remote_versions(&mut self, versions: Vec<AnnotationVersion>) {
        self.versions.merge_remote(versions);
    }
}

fn offset_copy(src: &Annotation, now: i64) -> Annotation {
    let mut copy = src.clone();
    copy.id = new_id();
    copy.coordinates.translate(DUPLICATE_OFFSET_PX, DUPLICATE_OFFSET_PX);
    copy.created_at = now;
    copy.updated_at = now;
    copy
}

fn clamp_into(coords: &mut Coordinates, bounds: ImageBounds) {
    match coords {
        Coordinates::Rect { x, y, width, height } | Coordinates::Text { x, y, width, height, .. } => {
            (*x, *y) = bounds.clamp_box_origin(*x, *y, *width, *height);
        }
        Coordinates::Circle { x, y, radius } => {
            (*x, *y) = bounds.clamp_circle_center(*x, *y, *radius);
        }
        Coordinates::Path { .. } => {}
    }
}
