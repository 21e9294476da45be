//! # Edit Session Management
//!
//! One user's live editing state on top of a document.
//!
//! An EditSession owns the document, the selection, and the undo history,
//! and is the only place where edit intents, comment operations, and
//! reverts come together. Widgets feed it intents; it feeds them back a
//! cursor.
//!
//! Every state-changing operation records a before/after snapshot pair, so
//! edits, comment operations, and reverts all undo the same way.

use crate::comments::validate_anchor;
use crate::document::{kind_of, ranges_of, status_runs, Document, StatusRun};
use crate::engine::{self, EditIntent, Selection};
use crate::errors::{EditResult, EditorError};
use crate::mutations::{Mutation, SpanOp};
use crate::options::EditorOptions;
use crate::undo_stack::{Snapshot, UndoEntry, UndoStack};
use redline_markup::document::SpanKind;
use redline_markup::CommentThread;
use std::ops::Range;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Single-user editing session.
pub struct EditSession {
    /// Document being edited
    pub document: Document,

    /// Current selection; the head doubles as the caret.
    pub selection: Selection,

    /// Behavior switches, `track_changes` chief among them.
    pub options: EditorOptions,

    /// Snapshot history for undo/redo.
    history: UndoStack,
}

impl EditSession {
    /// Create a session over an existing document.
    pub fn new(document: Document, options: EditorOptions) -> Self {
        let history = UndoStack::with_max_levels(options.max_undo_levels);
        Self {
            document,
            selection: Selection::caret(0),
            options,
            history,
        }
    }

    /// Convenience constructor: parse annotated markup and start at the top.
    pub fn open(label: impl Into<String>, source: &str, options: EditorOptions) -> Self {
        Self::new(Document::from_markup(label, source), options)
    }

    /// Run one edit intent through the intercept engine and apply the
    /// result.
    ///
    /// Returns the id of the change the edit created or grew, if any.
    /// Intents that only move the cursor (skipping over struck text,
    /// out-of-bounds positions) leave the document and history untouched.
    pub fn apply_intent(&mut self, intent: &EditIntent) -> Option<String> {
        let before = self.snapshot();
        let plan = engine::plan(
            &self.document.spans,
            self.selection,
            intent,
            &self.options,
            &mut self.document.ids,
        );

        let Some(mutation) = plan.mutation else {
            self.selection = Selection::caret(plan.cursor);
            return None;
        };

        match self.document.apply(&mutation) {
            Ok(version) => {
                debug!("applied {} at version {version}", mutation.label);
                self.selection = Selection::caret(plan.cursor);
                let after = self.snapshot();
                self.history.push(UndoEntry {
                    before,
                    after,
                    description: mutation.label.clone(),
                });
                plan.change_id
            }
            Err(err) => {
                warn!("mutation {} rejected: {err}", mutation.label);
                None
            }
        }
    }

    /// Highlight a range of plain text and open a comment thread on it in
    /// one step.
    ///
    /// The range may cross block boundaries but every covered character
    /// must still be `Original`; annotating over tracked changes or other
    /// highlights is refused.
    pub fn annotate(&mut self, range: Range<usize>, text: &str) -> EditResult<String> {
        if text.trim().is_empty() {
            return Err(EditorError::EmptyComment);
        }
        let runs = status_runs(&self.document.spans, range.clone());
        let mut has_text = false;
        for run in &runs {
            match run {
                StatusRun::Text {
                    kind: SpanKind::Original,
                    ..
                } => has_text = true,
                StatusRun::Separator { .. } => {}
                StatusRun::Text { .. } => return Err(EditorError::InvalidHighlightTarget),
            }
        }
        if !has_text {
            return Err(EditorError::InvalidHighlightTarget);
        }

        let before = self.snapshot();
        let id = self.document.ids.next_id();
        let mutation = Mutation::new(
            vec![SpanOp::MarkHighlight {
                range,
                id: id.clone(),
            }],
            "annotate",
        );
        self.document.apply(&mutation)?;

        let thread_id = self.document.ids.next_id();
        self.document.comments.add(
            &id,
            CommentThread::new(thread_id, text.to_string(), current_timestamp()),
        );
        self.document.touch();

        let after = self.snapshot();
        self.history.push(UndoEntry {
            before,
            after,
            description: "annotate".to_string(),
        });
        Ok(id)
    }

    /// Attach a new comment thread to an existing change or highlight.
    ///
    /// Returns the new thread's id. Fails on unknown ids, on empty text,
    /// and on the insertion side of a substitution, whose commentary
    /// belongs to the deletion side.
    pub fn add_comment(&mut self, change_id: &str, text: &str) -> EditResult<String> {
        if text.trim().is_empty() {
            return Err(EditorError::EmptyComment);
        }
        validate_anchor(&self.document.spans, change_id)?;

        let before = self.snapshot();
        let thread_id = self.document.ids.next_id();
        self.document.comments.add(
            change_id,
            CommentThread::new(thread_id.clone(), text.to_string(), current_timestamp()),
        );
        self.document.touch();

        let after = self.snapshot();
        self.history.push(UndoEntry {
            before,
            after,
            description: "add comment".to_string(),
        });
        Ok(thread_id)
    }

    /// Rewrite the text of an existing comment thread.
    pub fn edit_comment(
        &mut self,
        change_id: &str,
        thread_id: &str,
        text: &str,
    ) -> EditResult<()> {
        if text.trim().is_empty() {
            return Err(EditorError::EmptyComment);
        }
        let before = self.snapshot();
        let edited = self.document.comments.edit(
            change_id,
            thread_id,
            text.to_string(),
            current_timestamp(),
        );
        if !edited {
            return Err(EditorError::CommentNotFound {
                change_id: change_id.to_string(),
                thread_id: thread_id.to_string(),
            });
        }
        self.document.touch();

        let after = self.snapshot();
        self.history.push(UndoEntry {
            before,
            after,
            description: "edit comment".to_string(),
        });
        Ok(())
    }

    /// Remove one comment thread.
    ///
    /// Deleting the last thread on a highlight also clears the highlight
    /// itself; a highlight with nothing to say has no reason to stay.
    pub fn delete_comment(&mut self, change_id: &str, thread_id: &str) -> EditResult<()> {
        let before = self.snapshot();
        if !self.document.comments.remove(change_id, thread_id) {
            return Err(EditorError::CommentNotFound {
                change_id: change_id.to_string(),
                thread_id: thread_id.to_string(),
            });
        }

        let is_highlight = matches!(
            kind_of(&self.document.spans, change_id),
            Some(SpanKind::Highlight { .. })
        );
        if is_highlight && !self.document.comments.has_threads(change_id) {
            let ops = ranges_of(&self.document.spans, change_id)
                .into_iter()
                .map(|range| SpanOp::ClearMarks { range })
                .collect();
            self.document
                .apply(&Mutation::new(ops, "clear highlight"))?;
        } else {
            self.document.touch();
        }

        let after = self.snapshot();
        self.history.push(UndoEntry {
            before,
            after,
            description: "delete comment".to_string(),
        });
        Ok(())
    }

    /// Undo one tracked change or highlight without touching the rest of
    /// the document.
    ///
    /// - A deletion becomes plain text again
    /// - An insertion disappears
    /// - A substitution does both at once, whichever side is named
    /// - A highlight is cleared along with its comments
    ///
    /// The caret lands where the change began. Comments on the reverted
    /// change are pruned automatically.
    pub fn revert(&mut self, change_id: &str) -> EditResult<()> {
        let kind = kind_of(&self.document.spans, change_id)
            .ok_or_else(|| EditorError::ChangeNotFound(change_id.to_string()))?;

        let before = self.snapshot();
        let ranges = ranges_of(&self.document.spans, change_id);
        let landing = ranges.first().map(|r| r.start).unwrap_or(0);

        // Mark clearing never shifts positions, so those ops can lead;
        // removals run right to left.
        let mut ops = Vec::new();
        match &kind {
            SpanKind::Deleted { paired_with, .. } => {
                for range in &ranges {
                    ops.push(SpanOp::ClearMarks {
                        range: range.clone(),
                    });
                }
                if let Some(partner) = paired_with {
                    for range in ranges_of(&self.document.spans, partner).iter().rev() {
                        ops.push(SpanOp::RemoveText {
                            range: range.clone(),
                        });
                    }
                }
            }
            SpanKind::Inserted { paired_with, .. } => {
                if let Some(partner) = paired_with {
                    for range in &ranges_of(&self.document.spans, partner) {
                        ops.push(SpanOp::ClearMarks {
                            range: range.clone(),
                        });
                    }
                }
                for range in ranges.iter().rev() {
                    ops.push(SpanOp::RemoveText {
                        range: range.clone(),
                    });
                }
            }
            SpanKind::Highlight { .. } => {
                for range in &ranges {
                    ops.push(SpanOp::ClearMarks {
                        range: range.clone(),
                    });
                }
            }
            SpanKind::Original => {
                return Err(EditorError::ChangeNotFound(change_id.to_string()));
            }
        }

        self.document.apply(&Mutation::new(ops, "revert change"))?;
        self.selection = Selection::caret(landing.min(self.document.char_len()));

        let after = self.snapshot();
        self.history.push(UndoEntry {
            before,
            after,
            description: "revert change".to_string(),
        });
        Ok(())
    }

    /// Restore the state before the most recent operation. Returns the new
    /// document version.
    pub fn undo(&mut self) -> Option<u64> {
        let snapshot = self.history.undo()?.before.clone();
        self.restore(snapshot);
        Some(self.document.version)
    }

    /// Reapply the most recently undone operation.
    pub fn redo(&mut self) -> Option<u64> {
        let snapshot = self.history.redo()?.after.clone();
        self.restore(snapshot);
        Some(self.document.version)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// What the next undo would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    /// Replace the document from annotated markup, dropping history and
    /// selection.
    pub fn import_markup(&mut self, source: &str) {
        let label = self.document.label.clone();
        self.document = Document::from_markup(label, source);
        self.history.clear();
        self.selection = Selection::caret(0);
        debug!("imported document, {} chars", self.document.char_len());
    }

    /// Serialize the document with a regenerated metadata header.
    pub fn export(&self) -> String {
        self.document.export_markup()
    }

    /// Move the selection, clamping both ends into the document.
    pub fn set_selection(&mut self, anchor: usize, head: usize) {
        let len = self.document.char_len();
        self.selection = Selection::new(anchor.min(len), head.min(len));
    }

    /// Toggle change tracking for subsequent edits.
    pub fn set_tracking(&mut self, on: bool) {
        self.options.track_changes = on;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            spans: self.document.spans.clone(),
            comments: self.document.comments.clone(),
            cursor: self.selection.head,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let cursor = snapshot.cursor;
        self.document.restore(snapshot.spans, snapshot.comments);
        self.selection = Selection::caret(cursor.min(self.document.char_len()));
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
