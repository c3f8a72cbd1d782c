//! Linear undo/redo over full annotation-list snapshots.
//!
//! Every committing edit pushes the complete list. Pushing after an undo drops
//! the undone "future" entries; there is no branching. Undo and redo only move
//! the cursor and never create entries.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::doc::Annotation;

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Vec<Annotation>>,
    index: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl History {
    /// Start a history whose only entry is `initial`.
    #[must_use]
    pub fn new(initial: Vec<Annotation>) -> Self {
        Self { entries: vec![initial], index: 0 }
    }

    /// Append a snapshot after the cursor, discarding any redo entries.
    pub fn push(&mut self, snapshot: Vec<Annotation>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(snapshot);
        self.index = self.entries.len() - 1;
    }

    /// Step back one entry. Returns the snapshot now current, or `None` at the start.
    pub fn undo(&mut self) -> Option<&[Annotation]> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).map(Vec::as_slice)
    }

    /// Step forward one entry. Returns the snapshot now current, or `None` at the end.
    pub fn redo(&mut self) -> Option<&[Annotation]> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Cursor position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of stored snapshots, including the initial one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a history holds at least its initial snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The snapshot at the cursor.
    #[must_use]
    pub fn current(&self) -> &[Annotation] {
        self.entries.get(self.index).map_or(&[], Vec::as_slice)
    }
}
