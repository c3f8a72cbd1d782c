//! Engine: pointer handlers and the public editing API for one case canvas.
//!
//! DESIGN
//! ======
//! `Engine` pairs the [`AnnotationStore`] with the gesture state machine in
//! [`InputState`]. Pointer handlers return [`Action`]s for the host (repaint,
//! open a text editor, persist a created annotation); the host never mutates
//! the store behind the engine's back.
//!
//! State transitions, by tool:
//!
//! - `select`: pointer-down on a handle of the single selected rectangle
//!   starts `Resizing`; on an annotation it updates the selection and starts
//!   `Dragging`; on empty space it clears the selection.
//! - drawing tools: pointer-down seeds a draft and starts `Drawing`; moves
//!   reshape it; pointer-up commits it (text boxes first go through
//!   `TextEditing`).
//! - pointer-leave behaves exactly like pointer-up.
//!
//! Polygon and freehand drafts both append one vertex per move event.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::consts::{MIN_RESIZE_PX, MIN_TEXT_BOX_PX};
use crate::doc::{
    Annotation, AnnotationError, AnnotationId, AnnotationKind, AnnotationPatch, Coordinates, NewAnnotation, new_id,
};
use crate::geometry::{BoxRect, ImageBounds, Point, clip_span, span_with_min};
use crate::hit::{resize_handle_at, topmost_hit};
use crate::input::{InputState, Phase, PointerEvent, TextPrompt, Tool, UiState};
use crate::now_ms;
use crate::peers::PeerOverlay;
use crate::store::AnnotationStore;
use crate::version::AnnotationVersion;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A new annotation was committed to the list.
    AnnotationCreated(Annotation),
    /// Existing annotations were moved or resized and committed to history.
    AnnotationsChanged { ids: Vec<AnnotationId> },
    /// The selection set changed.
    SelectionChanged(Vec<AnnotationId>),
    /// Open a text editor over this box; answer with
    /// [`Engine::complete_text_input`] or [`Engine::cancel_text_input`].
    TextInputRequested(TextPrompt),
    /// An in-progress draft was thrown away without touching history.
    DraftDiscarded,
    /// Something visible changed; redraw.
    RenderNeeded,
}

/// Full annotation set for a case, as handed to the persistence API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSnapshot {
    pub case_id: String,
    pub user_id: String,
    /// Case-level snapshot number, counted by the caller from 1.
    pub version: u32,
    pub annotations: Vec<Annotation>,
    pub created_at: i64,
}

/// Everything the render layer and side panels read, in one borrow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineView<'a> {
    pub annotations: &'a [Annotation],
    pub selected_annotation_ids: &'a [AnnotationId],
    pub current_annotation: Option<&'a Annotation>,
    pub versions: &'a [AnnotationVersion],
    pub current_version: u32,
    pub version_overlay: Option<&'a Annotation>,
    pub peer_annotations: &'a BTreeMap<String, PeerOverlay>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub tool: Tool,
    pub phase: Phase,
    pub text_prompt: Option<TextPrompt>,
}

/// One case's editing session: the store, tool settings, and the gesture in
/// flight. Hosts feed it pointer events and read back [`Engine::view`].
#[derive(Debug)]
pub struct Engine {
    pub store: AnnotationStore,
    pub ui: UiState,
    pub input: InputState,
    pub image_bounds: Option<ImageBounds>,
}

impl Engine {
    #[must_use]
    pub fn new(case_id: &str, user_id: &str) -> Self {
        Self {
            store: AnnotationStore::new(case_id, user_id),
            ui: UiState::default(),
            input: InputState::default(),
            image_bounds: None,
        }
    }

    // --- Data inputs ---

    /// Hydrate from persisted annotations, resetting history and any gesture.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; nothing changes on error.
    pub fn load_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), AnnotationError> {
        self.store.load(annotations)?;
        self.input = InputState::Idle;
        Ok(())
    }

    /// Set the rendered image size that drag and resize clamp against.
    pub fn set_image_bounds(&mut self, bounds: ImageBounds) {
        self.image_bounds = Some(bounds);
    }

    /// Insert or refresh a peer's read-only overlay.
    pub fn add_peer_annotations(&mut self, peer_id: &str, annotations: Vec<Annotation>, color: &str) {
        self.store.peers_mut().upsert(peer_id, annotations, color);
    }

    pub fn set_peer_visibility(&mut self, peer_id: &str, visible: bool) -> bool {
        self.store.peers_mut().set_visible(peer_id, visible)
    }

    pub fn toggle_peer_visibility(&mut self, peer_id: &str) -> Option<bool> {
        self.store.peers_mut().toggle(peer_id)
    }

    pub fn remove_peer(&mut self, peer_id: &str) -> bool {
        self.store.peers_mut().remove(peer_id).is_some()
    }

    /// Peer overlays the render layer should draw, by ascending peer id.
    pub fn visible_peer_overlays(&self) -> impl Iterator<Item = (&str, &PeerOverlay)> {
        self.store.peers().visible()
    }

    /// Replace the version list outright, renumbering each lineage.
    pub fn set_versions(&mut self, versions: Vec<AnnotationVersion>) {
        self.store.set_versions(versions);
    }

    /// Fold in a polled version list, keeping versions saved here that the
    /// backend hasn't returned yet and dropping ones deleted here.
    pub fn merge_remote_versions(&mut self, versions: Vec<AnnotationVersion>) {
        self.store.merge_remote_versions(versions);
    }

    // --- Tool / color / text ---

    /// Switch tools. Discards any draft, settles any drag, and clears the selection.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = self.settle_gesture();
        self.ui.tool = tool;
        if !self.store.selection().is_empty() {
            self.store.clear_selection();
            actions.push(Action::SelectionChanged(Vec::new()));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn set_color(&mut self, color: &str) {
        color.clone_into(&mut self.ui.color);
    }

    /// Finish a pending text box with `text`, commit it, and select it.
    pub fn complete_text_input(&mut self, text: &str) -> Vec<Action> {
        if !matches!(self.input, InputState::TextEditing { .. }) {
            debug!("text input completed with no pending text box");
            return Vec::new();
        }
        let InputState::TextEditing { mut draft } = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        if let Coordinates::Text { text: slot, .. } = &mut draft.coordinates {
            text.clone_into(slot);
        }
        match self.store.commit_draft(draft) {
            Ok(ann) => {
                let ids = vec![ann.id.clone()];
                self.store.select(&ids);
                vec![Action::AnnotationCreated(ann), Action::SelectionChanged(ids), Action::RenderNeeded]
            }
            Err(e) => {
                debug!(error = %e, "text draft rejected");
                vec![Action::DraftDiscarded, Action::RenderNeeded]
            }
        }
    }

    /// Drop a pending text box without touching history.
    pub fn cancel_text_input(&mut self) -> Vec<Action> {
        if !matches!(self.input, InputState::TextEditing { .. }) {
            return Vec::new();
        }
        self.input = InputState::Idle;
        vec![Action::DraftDiscarded, Action::RenderNeeded]
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, ev: PointerEvent) -> Vec<Action> {
        let mut actions = self.settle_gesture();
        let p = ev.point();
        match self.ui.tool.kind() {
            None => actions.extend(self.select_at(p, ev.modifier)),
            Some(kind) => {
                let p = self.clamp_point(p);
                self.input = InputState::Drawing { anchor: p, draft: self.seed_draft(kind, p) };
                actions.push(Action::RenderNeeded);
            }
        }
        actions
    }

    pub fn on_pointer_move(&mut self, ev: PointerEvent) -> Vec<Action> {
        let p = ev.point();
        let bounds = self.image_bounds;
        match &mut self.input {
            InputState::Idle | InputState::TextEditing { .. } => Vec::new(),
            InputState::Drawing { anchor, draft } => {
                let p = clamp_to(bounds, p);
                reshape_draft(draft, *anchor, p);
                vec![Action::RenderNeeded]
            }
            InputState::Dragging { last, moved } => {
                let (dx, dy) = (p.x - last.x, p.y - last.y);
                *last = p;
                if self.store.translate_selected(dx, dy, bounds) > 0 {
                    *moved = true;
                }
                vec![Action::RenderNeeded]
            }
            InputState::Resizing { id, handle, anchor, orig, moved } => {
                let (x, width) = if handle.moves_x() {
                    fit_axis(anchor.x, p.x, bounds.map(|b| b.width))
                } else {
                    (orig.x, orig.width)
                };
                let (y, height) = if handle.moves_y() {
                    fit_axis(anchor.y, p.y, bounds.map(|b| b.height))
                } else {
                    (orig.y, orig.height)
                };
                if self.store.set_box(id, BoxRect { x, y, width, height }) {
                    *moved = true;
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, _ev: PointerEvent) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::TextEditing { draft } => {
                self.input = InputState::TextEditing { draft };
                Vec::new()
            }
            InputState::Drawing { draft, .. } => self.finish_drawing(draft),
            InputState::Dragging { moved, .. } => {
                if !moved || !self.store.commit_gesture() {
                    return Vec::new();
                }
                let ids = self
                    .store
                    .selection()
                    .iter()
                    .filter(|id| self.store.get(id).is_some_and(|a| !a.is_locked()))
                    .cloned()
                    .collect();
                vec![Action::AnnotationsChanged { ids }, Action::RenderNeeded]
            }
            InputState::Resizing { id, moved, .. } => {
                if !moved || !self.store.commit_gesture() {
                    return Vec::new();
                }
                vec![Action::AnnotationsChanged { ids: vec![id] }, Action::RenderNeeded]
            }
        }
    }

    /// Pointer left the surface mid-gesture; identical to pointer-up.
    pub fn on_pointer_leave(&mut self, ev: PointerEvent) -> Vec<Action> {
        self.on_pointer_up(ev)
    }

    fn select_at(&mut self, p: Point, modifier: bool) -> Vec<Action> {
        if let Some(target) = self.store.sole_selected() {
            if !target.is_locked() {
                if let (Some(handle), Some(orig)) = (resize_handle_at(p, target), target.coordinates.bbox()) {
                    self.input = InputState::Resizing {
                        id: target.id.clone(),
                        handle,
                        anchor: handle.opposite().position(&orig),
                        orig,
                        moved: false,
                    };
                    return vec![Action::RenderNeeded];
                }
            }
        }

        let Some(hit) = topmost_hit(p, self.store.annotations()).cloned() else {
            if self.store.selection().is_empty() {
                return Vec::new();
            }
            self.store.clear_selection();
            return vec![Action::SelectionChanged(Vec::new()), Action::RenderNeeded];
        };

        let mut actions = Vec::new();
        let selected = if modifier {
            self.store.toggle_selected(&hit);
            actions.push(Action::SelectionChanged(self.store.selection().to_vec()));
            self.store.is_selected(&hit)
        } else {
            if !self.store.is_selected(&hit) {
                self.store.select(std::slice::from_ref(&hit));
                actions.push(Action::SelectionChanged(self.store.selection().to_vec()));
            }
            true
        };
        if selected {
            self.input = InputState::Dragging { last: p, moved: false };
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn seed_draft(&self, kind: AnnotationKind, p: Point) -> Annotation {
        let coordinates = match kind {
            AnnotationKind::Rectangle => Coordinates::Rect { x: p.x, y: p.y, width: 0.0, height: 0.0 },
            AnnotationKind::Text => Coordinates::Text { x: p.x, y: p.y, width: 0.0, height: 0.0, text: String::new() },
            AnnotationKind::Circle => Coordinates::Circle { x: p.x, y: p.y, radius: 0.0 },
            AnnotationKind::Polygon | AnnotationKind::Freehand => Coordinates::Path { points: Vec::new() },
        };
        Annotation {
            id: new_id(),
            case_id: self.store.case_id().to_string(),
            user_id: self.store.user_id().to_string(),
            kind,
            coordinates,
            color: self.ui.color.clone(),
            label: None,
            locked: None,
            visible: Some(true),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn finish_drawing(&mut self, draft: Annotation) -> Vec<Action> {
        if is_degenerate(&draft) {
            debug!(kind = %draft.kind, "zero-size draft discarded");
            return vec![Action::DraftDiscarded, Action::RenderNeeded];
        }
        if draft.kind == AnnotationKind::Text {
            return self.open_text_prompt(draft);
        }
        match self.store.commit_draft(draft) {
            Ok(ann) => vec![Action::AnnotationCreated(ann), Action::RenderNeeded],
            Err(e) => {
                debug!(error = %e, "draft rejected");
                vec![Action::DraftDiscarded, Action::RenderNeeded]
            }
        }
    }

    fn open_text_prompt(&mut self, mut draft: Annotation) -> Vec<Action> {
        let Some(b) = draft.coordinates.bbox() else {
            return vec![Action::DraftDiscarded, Action::RenderNeeded];
        };
        if b.width < MIN_TEXT_BOX_PX || b.height < MIN_TEXT_BOX_PX {
            debug!(width = b.width, height = b.height, "text box below minimum size discarded");
            return vec![Action::DraftDiscarded, Action::RenderNeeded];
        }
        let b = match self.image_bounds {
            Some(bounds) => {
                let (x, width) = clip_span(b.x, b.width, bounds.width, 0.0);
                let (y, height) = clip_span(b.y, b.height, bounds.height, 0.0);
                BoxRect { x, y, width, height }
            }
            None => b,
        };
        draft.coordinates.set_bbox(b);
        self.input = InputState::TextEditing { draft };
        vec![Action::TextInputRequested(TextPrompt::from(b)), Action::RenderNeeded]
    }

    /// End whatever gesture is in flight before a new one starts: drafts are
    /// discarded, moved drags and resizes are committed.
    fn settle_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Drawing { .. } | InputState::TextEditing { .. } => {
                debug!("in-progress draft discarded");
                vec![Action::DraftDiscarded]
            }
            gesture @ (InputState::Dragging { .. } | InputState::Resizing { .. }) => {
                self.input = gesture;
                let mut actions = self.on_pointer_up(PointerEvent::at(0.0, 0.0));
                actions.retain(|a| *a != Action::RenderNeeded);
                actions
            }
        }
    }

    fn clamp_point(&self, p: Point) -> Point {
        clamp_to(self.image_bounds, p)
    }

    // --- Editing API ---

    /// Create an annotation for this case and user with the current color.
    ///
    /// # Errors
    ///
    /// Rejects coordinates that don't match `kind`.
    pub fn create_annotation(
        &mut self,
        kind: AnnotationKind,
        coordinates: Coordinates,
        label: Option<String>,
    ) -> Result<Annotation, AnnotationError> {
        self.store.create_annotation(NewAnnotation {
            case_id: self.store.case_id().to_string(),
            user_id: self.store.user_id().to_string(),
            kind,
            coordinates,
            color: self.ui.color.clone(),
            label,
        })
    }

    /// See [`AnnotationStore::update_annotation`]; unknown ids yield `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Rejects patch coordinates that don't fit the annotation's kind.
    pub fn update_annotation(&mut self, id: &str, patch: &AnnotationPatch) -> Result<bool, AnnotationError> {
        self.store.update_annotation(id, patch)
    }

    pub fn delete_annotations(&mut self, ids: &[AnnotationId]) -> usize {
        self.store.delete_annotations(ids)
    }

    pub fn delete_selected(&mut self) -> usize {
        self.store.delete_selected()
    }

    pub fn duplicate_annotations(&mut self, ids: &[AnnotationId]) -> Vec<AnnotationId> {
        self.store.duplicate_annotations(ids)
    }

    pub fn lock_annotations(&mut self, ids: &[AnnotationId], locked: bool) -> usize {
        self.store.lock_annotations(ids, locked)
    }

    pub fn toggle_visibility(&mut self, ids: &[AnnotationId], visible: bool) -> usize {
        self.store.toggle_visibility(ids, visible)
    }

    pub fn copy(&mut self, ids: &[AnnotationId]) -> usize {
        self.store.copy(ids)
    }

    pub fn paste(&mut self) -> Vec<AnnotationId> {
        self.store.paste()
    }

    pub fn select(&mut self, ids: &[AnnotationId]) {
        self.store.select(ids);
    }

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    pub fn save_version(&mut self, annotation_id: &str, description: Option<String>) -> Option<AnnotationVersion> {
        self.store.save_version(annotation_id, description)
    }

    pub fn restore_version(&mut self, version_id: &str) -> Option<AnnotationId> {
        self.store.restore_version(version_id)
    }

    pub fn preview_version(&mut self, version_id: &str) -> bool {
        self.store.preview_version(version_id)
    }

    pub fn clear_version_overlay(&mut self) {
        self.store.clear_version_overlay();
    }

    pub fn delete_version(&mut self, version_id: &str) -> bool {
        self.store.delete_version(version_id)
    }

    // --- Queries ---

    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        self.store.annotations()
    }

    #[must_use]
    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.store.get(id)
    }

    #[must_use]
    pub fn selection(&self) -> &[AnnotationId] {
        self.store.selection()
    }

    /// The in-progress draft, while drawing or awaiting text.
    #[must_use]
    pub fn current_annotation(&self) -> Option<&Annotation> {
        self.input.draft()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.input.phase()
    }

    #[must_use]
    pub fn view(&self) -> EngineView<'_> {
        let versions = self.store.versions();
        EngineView {
            annotations: self.store.annotations(),
            selected_annotation_ids: self.store.selection(),
            current_annotation: self.input.draft(),
            versions: versions.versions(),
            current_version: versions.current_version(),
            version_overlay: versions.overlay(),
            peer_annotations: self.store.peers().as_map(),
            can_undo: self.store.can_undo(),
            can_redo: self.store.can_redo(),
            tool: self.ui.tool,
            phase: self.input.phase(),
            text_prompt: match &self.input {
                InputState::TextEditing { draft } => draft.coordinates.bbox().map(TextPrompt::from),
                _ => None,
            },
        }
    }

    /// The annotation list serialized in the persistence JSON shape.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::Json`] if serialization fails.
    pub fn annotations_json(&self) -> Result<String, AnnotationError> {
        Ok(serde_json::to_string(self.store.annotations())?)
    }

    #[must_use]
    pub fn case_snapshot(&self, version: u32) -> CaseSnapshot {
        CaseSnapshot {
            case_id: self.store.case_id().to_string(),
            user_id: self.store.user_id().to_string(),
            version,
            annotations: self.store.annotations().to_vec(),
            created_at: now_ms(),
        }
    }
}

fn clamp_to(bounds: Option<ImageBounds>, p: Point) -> Point {
    match bounds {
        Some(b) => Point::new(p.x.clamp(0.0, b.width.max(0.0)), p.y.clamp(0.0, b.height.max(0.0))),
        None => p,
    }
}

fn reshape_draft(draft: &mut Annotation, anchor: Point, p: Point) {
    match &mut draft.coordinates {
        coords @ (Coordinates::Rect { .. } | Coordinates::Text { .. }) => {
            coords.set_bbox(BoxRect::from_corners(anchor, p));
        }
        Coordinates::Circle { x, y, radius } => {
            *x = anchor.x;
            *y = anchor.y;
            *radius = anchor.distance(p);
        }
        Coordinates::Path { points } => points.push(p),
    }
}

fn fit_axis(anchor: f64, pointer: f64, limit: Option<f64>) -> (f64, f64) {
    let (start, len) = span_with_min(anchor, pointer, MIN_RESIZE_PX);
    match limit {
        Some(limit) => clip_span(start, len, limit, MIN_RESIZE_PX),
        None => (start, len),
    }
}

fn is_degenerate(draft: &Annotation) -> bool {
    match &draft.coordinates {
        Coordinates::Rect { width, height, .. } | Coordinates::Text { width, height, .. } => {
            *width <= 0.0 || *height <= 0.0
        }
        Coordinates::Circle { radius, .. } => *radius <= 0.0,
        Coordinates::Path { points } => points.is_empty(),
    }
}
