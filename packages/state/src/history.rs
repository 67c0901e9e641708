//! # Undo/Redo History
//!
//! Snapshot-based history: each entry records the document state as it was
//! before a mutation (or batch) applied. Undo restores a snapshot through
//! the store's normal replace path, so history can never introduce a state
//! shape the store would not accept.

use crate::document::DocumentState;

/// One undoable step.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// State before the step applied.
    snapshot: DocumentState,

    /// Human-readable label ("add hero-1", "remove section s2").
    description: Option<String>,
}

/// Undo/redo stack over document snapshots.
#[derive(Debug)]
pub struct UndoStack {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,

    /// Maximum undo levels (0 = unlimited).
    max_levels: usize,
}

impl UndoStack {
    /// Default capacity of 50 steps, matching the original builder.
    pub fn new() -> Self {
        Self::with_max_levels(50)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_levels,
        }
    }

    /// Record the state as it was before a step applies. Clears the redo
    /// stack: a new action invalidates the redone future.
    pub fn record(&mut self, snapshot: DocumentState, description: Option<String>) {
        self.undo.push(HistoryEntry {
            snapshot,
            description,
        });
        if self.max_levels > 0 && self.undo.len() > self.max_levels {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Pop the most recent step. `current` is the live state, pushed onto
    /// the redo stack; the returned snapshot should be fed to
    /// `Store::replace`.
    pub fn undo(&mut self, current: DocumentState) -> Option<DocumentState> {
        let entry = self.undo.pop()?;
        self.redo.push(HistoryEntry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Some(entry.snapshot)
    }

    /// Reapply the most recently undone step.
    pub fn redo(&mut self, current: DocumentState) -> Option<DocumentState> {
        let entry = self.redo.pop()?;
        self.undo.push(HistoryEntry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Some(entry.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo.last().and_then(|e| e.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo.last().and_then(|e| e.description.as_deref())
    }

    /// Drop all history (document reload).
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
