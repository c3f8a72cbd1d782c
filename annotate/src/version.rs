//! Per-annotation version log.
//!
//! A version is an immutable snapshot of one annotation's kind, coordinates,
//! color, and label. Versions of the same annotation form a lineage numbered
//! `1..=n` with no gaps; deleting a version renumbers the rest of its lineage.
//!
//! Restoring is a field-level merge rather than an overwrite: when the target
//! has a directly preceding version, only the coordinate fields that changed
//! between those two versions are taken from the target, and every other
//! coordinate keeps the live annotation's current value.
//!
//! Pushed lists from the backend are merged, not swapped in: versions saved
//! here stay until a pushed list carries them, and versions deleted here stay
//! gone even if a pushed list still has them.

#[cfg(test)]
#[path = "version_test.rs"]
mod version_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::doc::{Annotation, AnnotationId, AnnotationKind, Coordinates, new_id};
use crate::geometry::Point;
use crate::now_ms;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationVersion {
    pub id: String,
    pub annotation_id: AnnotationId,
    pub user_id: String,
    /// 1-based, contiguous within the lineage.
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub coordinates: Coordinates,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_description: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct VersionLog {
    versions: Vec<AnnotationVersion>,
    current_version: u32,
    overlay: Option<Annotation>,
    /// Saved here, not yet seen in a pushed list.
    unsynced: BTreeSet<String>,
    /// Deleted here; pushed lists that still carry these are filtered.
    deleted: BTreeSet<String>,
}

impl Default for VersionLog {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
            current_version: 1,
            overlay: None,
            unsynced: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }
}

impl VersionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn versions(&self) -> &[AnnotationVersion] {
        &self.versions
    }

    /// Version number most recently saved, restored, or left highest by a delete.
    #[must_use]
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Reconstructed annotation being previewed, if any.
    #[must_use]
    pub fn overlay(&self) -> Option<&Annotation> {
        self.overlay.as_ref()
    }

    #[must_use]
    pub fn get(&self, version_id: &str) -> Option<&AnnotationVersion> {
        self.versions.iter().find(|v| v.id == version_id)
    }

    /// Versions of one annotation in version order.
    #[must_use]
    pub fn lineage(&self, annotation_id: &str) -> Vec<&AnnotationVersion> {
        let mut out: Vec<&AnnotationVersion> =
            self.versions.iter().filter(|v| v.annotation_id == annotation_id).collect();
        out.sort_by_key(|v| v.version);
        out
    }

    fn max_version(&self, annotation_id: &str) -> u32 {
        self.versions
            .iter()
            .filter(|v| v.annotation_id == annotation_id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
    }

    /// Snapshot `ann` as the next version of its lineage.
    pub fn save(&mut self, ann: &Annotation, user_id: &str, description: Option<String>) -> &AnnotationVersion {
        let version = self.max_version(&ann.id) + 1;
        self.current_version = version;
        debug!(annotation_id = %ann.id, version, "version saved");
        let idx = self.versions.len();
        let id = new_id();
        self.unsynced.insert(id.clone());
        self.versions.push(AnnotationVersion {
            id,
            annotation_id: ann.id.clone(),
            user_id: user_id.to_string(),
            version,
            kind: ann.kind,
            coordinates: ann.coordinates.clone(),
            color: ann.color.clone(),
            label: ann.label.clone(),
            change_description: description,
            created_at: now_ms(),
        });
        &self.versions[idx]
    }

    /// Rebuild the annotation a version describes, merged against `live`.
    ///
    /// Kind, color, and label come from the version. Coordinates follow the
    /// field-level merge described in the module docs; without a live
    /// annotation or a preceding version the version's coordinates are used
    /// whole, and a missing live annotation is recreated from the record.
    #[must_use]
    pub fn reconstruct(&self, version_id: &str, live: Option<&Annotation>, case_id: &str) -> Option<Annotation> {
        let target = self.get(version_id)?;
        let preceding = self
            .versions
            .iter()
            .find(|v| v.annotation_id == target.annotation_id && v.version + 1 == target.version);

        let coordinates = match (preceding, live) {
            (Some(prev), Some(live)) if prev.kind == target.kind && live.kind == target.kind => {
                merge_coordinates(&prev.coordinates, &target.coordinates, &live.coordinates)
            }
            _ => target.coordinates.clone(),
        };

        let now = now_ms();
        let restored = match live {
            Some(live) => Annotation {
                kind: target.kind,
                coordinates,
                color: target.color.clone(),
                label: target.label.clone(),
                updated_at: now,
                ..live.clone()
            },
            None => Annotation {
                id: target.annotation_id.clone(),
                case_id: case_id.to_string(),
                user_id: target.user_id.clone(),
                kind: target.kind,
                coordinates,
                color: target.color.clone(),
                label: target.label.clone(),
                locked: None,
                visible: None,
                created_at: target.created_at,
                updated_at: now,
            },
        };
        Some(restored)
    }

    pub fn set_current_version(&mut self, version: u32) {
        self.current_version = version;
    }

    pub fn set_overlay(&mut self, overlay: Annotation) {
        self.overlay = Some(overlay);
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    /// Remove a version and renumber its lineage to `1..=n`.
    ///
    /// The current-version pointer becomes the lineage's highest remaining
    /// number, or 1 when the lineage is now empty. Returns false for an
    /// unknown id.
    pub fn delete(&mut self, version_id: &str) -> bool {
        let Some(pos) = self.versions.iter().position(|v| v.id == version_id) else {
            debug!(%version_id, "delete of unknown version ignored");
            return false;
        };
        let removed = self.versions.remove(pos);
        if !self.unsynced.remove(&removed.id) {
            self.deleted.insert(removed.id.clone());
        }
        self.renumber_lineage(&removed.annotation_id);
        self.current_version = self.max_version(&removed.annotation_id).max(1);
        true
    }

    /// Replace the log with `versions` outright, forgetting which entries were
    /// saved or deleted locally. Every lineage is renumbered.
    pub fn replace_all(&mut self, versions: Vec<AnnotationVersion>) {
        self.unsynced.clear();
        self.deleted.clear();
        self.install(versions);
    }

    /// Fold in a list pushed by the backend.
    ///
    /// Local saves the list doesn't carry yet are kept, and local deletes the
    /// list still carries are dropped. Every lineage is renumbered.
    pub fn merge_remote(&mut self, remote: Vec<AnnotationVersion>) {
        self.deleted.retain(|id| remote.iter().any(|v| &v.id == id));
        self.unsynced.retain(|id| !remote.iter().any(|v| &v.id == id));
        let pending: Vec<AnnotationVersion> =
            self.versions.iter().filter(|v| self.unsynced.contains(&v.id)).cloned().collect();
        let mut merged: Vec<AnnotationVersion> =
            remote.into_iter().filter(|v| !self.deleted.contains(&v.id)).collect();
        debug!(remote = merged.len(), pending = pending.len(), "pushed versions merged");
        merged.extend(pending);
        self.install(merged);
    }

    fn install(&mut self, versions: Vec<AnnotationVersion>) {
        self.versions = versions;
        let mut lineages: Vec<AnnotationId> = self.versions.iter().map(|v| v.annotation_id.clone()).collect();
        lineages.sort();
        lineages.dedup();
        for annotation_id in &lineages {
            self.renumber_lineage(annotation_id);
        }
        self.current_version = self.versions.iter().map(|v| v.version).max().unwrap_or(1);
    }

    fn renumber_lineage(&mut self, annotation_id: &str) {
        let mut positions: Vec<usize> = self
            .versions
            .iter()
            .enumerate()
            .filter(|(_, v)| v.annotation_id == annotation_id)
            .map(|(i, _)| i)
            .collect();
        positions.sort_by_key(|&i| (self.versions[i].version, self.versions[i].created_at));
        for (n, &i) in positions.iter().enumerate() {
            let number = u32::try_from(n + 1).unwrap_or(u32::MAX);
            if self.versions[i].version != number {
                debug!(%annotation_id, from = self.versions[i].version, to = number, "version renumbered");
                self.versions[i].version = number;
            }
        }
    }
}

/// Per field: the target's value if it differs from the preceding version's,
/// otherwise the live value. Shapes that disagree fall back to the target.
fn merge_coordinates(prev: &Coordinates, target: &Coordinates, live: &Coordinates) -> Coordinates {
    match (prev, target, live) {
        (
            Coordinates::Rect { x: px, y: py, width: pw, height: ph },
            Coordinates::Rect { x: tx, y: ty, width: tw, height: th },
            Coordinates::Rect { x: lx, y: ly, width: lw, height: lh },
        ) => Coordinates::Rect {
            x: pick(px, tx, lx),
            y: pick(py, ty, ly),
            width: pick(pw, tw, lw),
            height: pick(ph, th, lh),
        },
        (
            Coordinates::Text { x: px, y: py, width: pw, height: ph, text: pt },
            Coordinates::Text { x: tx, y: ty, width: tw, height: th, text: tt },
            Coordinates::Text { x: lx, y: ly, width: lw, height: lh, text: lt },
        ) => Coordinates::Text {
            x: pick(px, tx, lx),
            y: pick(py, ty, ly),
            width: pick(pw, tw, lw),
            height: pick(ph, th, lh),
            text: pick(pt, tt, lt),
        },
        (
            Coordinates::Circle { x: px, y: py, radius: pr },
            Coordinates::Circle { x: tx, y: ty, radius: tr },
            Coordinates::Circle { x: lx, y: ly, radius: lr },
        ) => Coordinates::Circle { x: pick(px, tx, lx), y: pick(py, ty, ly), radius: pick(pr, tr, lr) },
        (
            Coordinates::Path { points: pp },
            Coordinates::Path { points: tp },
            Coordinates::Path { points: lp },
        ) => Coordinates::Path { points: pick::<Vec<Point>>(pp, tp, lp) },
        _ => target.clone(),
    }
}

fn pick<T: PartialEq + Clone>(prev: &T, target: &T, live: &T) -> T {
    if prev == target { live.clone() } else { target.clone() }
}
