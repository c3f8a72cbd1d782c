//! Replay scripts: a JSON list of UI steps applied to a fresh engine.
//!
//! Steps name annotations and versions by their index in the engine's list
//! at the moment the step runs, so a script reads like a recorded session:
//! "draw, then select annotation 0, then save a version of it".

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use annotate::doc::{Annotation, AnnotationError, AnnotationId, AnnotationPatch};
use annotate::engine::{Action, Engine};
use annotate::geometry::ImageBounds;
use annotate::input::{PointerEvent, Tool};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("step {step}: no annotation at index {index}")]
    NoSuchAnnotation { step: usize, index: usize },
    #[error("step {step}: no version at index {index}")]
    NoSuchVersion { step: usize, index: usize },
    #[error("step {step}: {source}")]
    Rejected { step: usize, source: AnnotationError },
    #[error("initial annotations rejected: {0}")]
    Load(#[source] AnnotationError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub case_id: String,
    pub user_id: String,
    #[serde(default)]
    pub image_bounds: Option<ImageBounds>,
    /// Persisted annotations to hydrate before the first step.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub steps: Vec<Step>,
}

/// Annotation indexes; `None` means "whatever is selected".
type Targets = Option<Vec<usize>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    Tool {
        tool: Tool,
    },
    Color {
        color: String,
    },
    Down(PointerEvent),
    Move(PointerEvent),
    Up(PointerEvent),
    Leave(PointerEvent),
    Text {
        text: String,
    },
    CancelText,
    Undo,
    Redo,
    Copy {
        #[serde(default)]
        annotations: Targets,
    },
    Paste,
    Duplicate {
        #[serde(default)]
        annotations: Targets,
    },
    Delete {
        #[serde(default)]
        annotations: Targets,
    },
    Lock {
        #[serde(default)]
        annotations: Targets,
        locked: bool,
    },
    Visibility {
        #[serde(default)]
        annotations: Targets,
        visible: bool,
    },
    Update {
        annotation: usize,
        patch: AnnotationPatch,
    },
    SaveVersion {
        annotation: usize,
        #[serde(default)]
        description: Option<String>,
    },
    RestoreVersion {
        version: usize,
    },
    PreviewVersion {
        version: usize,
    },
    ClearVersionOverlay,
    DeleteVersion {
        version: usize,
    },
    Select {
        annotations: Vec<usize>,
    },
}

impl Script {
    /// Parse a script from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the serde error for malformed scripts.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build an engine for this script and run every step against it.
    ///
    /// # Errors
    ///
    /// Stops at the first step that names a missing annotation or version, or
    /// whose payload the engine rejects.
    pub fn run(&self) -> Result<Engine, ScriptError> {
        let mut engine = Engine::new(&self.case_id, &self.user_id);
        if let Some(bounds) = self.image_bounds {
            engine.set_image_bounds(bounds);
        }
        if !self.annotations.is_empty() {
            engine.load_annotations(self.annotations.clone()).map_err(ScriptError::Load)?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            let actions = apply_step(&mut engine, i, step)?;
            debug!(step = i, ?actions, "step applied");
        }
        Ok(engine)
    }
}

fn apply_step(engine: &mut Engine, step: usize, s: &Step) -> Result<Vec<Action>, ScriptError> {
    let rejected = |source| ScriptError::Rejected { step, source };
    let actions = match s {
        Step::Tool { tool } => engine.set_tool(*tool),
        Step::Color { color } => {
            engine.set_color(color);
            Vec::new()
        }
        Step::Down(ev) => engine.on_pointer_down(*ev),
        Step::Move(ev) => engine.on_pointer_move(*ev),
        Step::Up(ev) => engine.on_pointer_up(*ev),
        Step::Leave(ev) => engine.on_pointer_leave(*ev),
        Step::Text { text } => engine.complete_text_input(text),
        Step::CancelText => engine.cancel_text_input(),
        Step::Undo => {
            engine.undo();
            Vec::new()
        }
        Step::Redo => {
            engine.redo();
            Vec::new()
        }
        Step::Copy { annotations } => {
            let ids = targets(engine, step, annotations.as_deref())?;
            engine.copy(&ids);
            Vec::new()
        }
        Step::Paste => {
            engine.paste();
            Vec::new()
        }
        Step::Duplicate { annotations } => {
            let ids = targets(engine, step, annotations.as_deref())?;
            engine.duplicate_annotations(&ids);
            Vec::new()
        }
        Step::Delete { annotations } => {
            let ids = targets(engine, step, annotations.as_deref())?;
            engine.delete_annotations(&ids);
            Vec::new()
        }
        Step::Lock { annotations, locked } => {
            let ids = targets(engine, step, annotations.as_deref())?;
            engine.lock_annotations(&ids, *locked);
            Vec::new()
        }
        Step::Visibility { annotations, visible } => {
            let ids = targets(engine, step, annotations.as_deref())?;
            engine.toggle_visibility(&ids, *visible);
            Vec::new()
        }
        Step::Update { annotation, patch } => {
            let id = annotation_id(engine, step, *annotation)?;
            engine.update_annotation(&id, patch).map_err(rejected)?;
            Vec::new()
        }
        Step::SaveVersion { annotation, description } => {
            let id = annotation_id(engine, step, *annotation)?;
            engine.save_version(&id, description.clone());
            Vec::new()
        }
        Step::RestoreVersion { version } => {
            let id = version_id(engine, step, *version)?;
            engine.restore_version(&id);
            vec![Action::RenderNeeded]
        }
        Step::PreviewVersion { version } => {
            let id = version_id(engine, step, *version)?;
            engine.preview_version(&id);
            vec![Action::RenderNeeded]
        }
        Step::ClearVersionOverlay => {
            engine.clear_version_overlay();
            vec![Action::RenderNeeded]
        }
        Step::DeleteVersion { version } => {
            let id = version_id(engine, step, *version)?;
            engine.delete_version(&id);
            Vec::new()
        }
        Step::Select { annotations } => {
            let ids = targets(engine, step, Some(annotations.as_slice()))?;
            engine.select(&ids);
            vec![Action::SelectionChanged(engine.selection().to_vec())]
        }
    };
    Ok(actions)
}

fn annotation_id(engine: &Engine, step: usize, index: usize) -> Result<AnnotationId, ScriptError> {
    engine
        .annotations()
        .get(index)
        .map(|a| a.id.clone())
        .ok_or(ScriptError::NoSuchAnnotation { step, index })
}

fn version_id(engine: &Engine, step: usize, index: usize) -> Result<String, ScriptError> {
    engine
        .view()
        .versions
        .get(index)
        .map(|v| v.id.clone())
        .ok_or(ScriptError::NoSuchVersion { step, index })
}

fn targets(engine: &Engine, step: usize, indexes: Option<&[usize]>) -> Result<Vec<AnnotationId>, ScriptError> {
    match indexes {
        None => Ok(engine.selection().to_vec()),
        Some(indexes) => indexes.iter().map(|&i| annotation_id(engine, step, i)).collect(),
    }
}
