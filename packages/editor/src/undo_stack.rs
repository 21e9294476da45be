//! # Undo History
//!
//! Bounded two-stack history of whole-state snapshots.
//!
//! Every recorded operation keeps the full document state from both sides,
//! so undo and redo are plain restores with no inverse-operation
//! bookkeeping. Snapshots are cheap enough at review-document sizes that
//! the simplicity wins.

use redline_markup::{CommentStore, SpanDocument};

/// Everything needed to put a session back the way it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub spans: SpanDocument,
    pub comments: CommentStore,
    pub cursor: usize,
}

/// One undoable operation: the states on either side of it.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub before: Snapshot,
    pub after: Snapshot,
    pub description: String,
}

/// History of applied operations with a bounded depth.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    max_levels: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// `max_levels` of zero means unbounded.
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record an operation, dropping the oldest entry when the stack is
    /// full. Redoable entries become unreachable.
    pub fn push(&mut self, entry: UndoEntry) {
        self.undo_stack.push(entry);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Move the most recent operation onto the redo stack and hand it back
    /// so the caller can restore its `before` state.
    pub fn undo(&mut self) -> Option<&UndoEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry);
        self.redo_stack.last()
    }

    /// The inverse of [`undo`](Self::undo); the caller restores `after`.
    pub fn redo(&mut self) -> Option<&UndoEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry);
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// What the next undo would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.description.as_str())
    }

    /// What the next redo would reapply.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.description.as_str())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
