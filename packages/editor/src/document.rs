//! # Document Handle
//!
//! Core document abstraction for tracked editing.
//!
//! A `Document` owns one span store and its comment threads. Every change
//! goes through [`Document::apply`], which keeps the batch atomic: the ops
//! either all land or none do, followed by one normalization pass, orphaned
//! comment pruning, and a version bump.
//!
//! ## Lifecycle
//!
//! ```text
//! Import → Edit → Export
//!   ↓       ↓       ↓
//! markup  spans   markup + metadata header
//! ```
//!
//! Persistence belongs to collaborators; a document never touches disk.

use crate::mutations::{Mutation, MutationError};
use redline_markup::comment::CommentStore;
use redline_markup::document::{SpanDocument, SpanKind};
use redline_markup::id_generator::IdGenerator;
use redline_markup::{metadata, serialize, Parser};
use std::ops::Range;

/// Editable tracked document
#[derive(Debug, Clone)]
pub struct Document {
    /// Label naming the document; seeds change id generation
    pub label: String,

    /// Current version number (increments on each mutation)
    pub version: u64,

    pub(crate) spans: SpanDocument,
    pub(crate) comments: CommentStore,
    pub(crate) metadata: Vec<(String, String)>,
    pub(crate) ids: IdGenerator,
}

/// One run of same-status characters, as reported by [`Document::status_in`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatusRun {
    /// Characters inside one span. `range` is the part inside the queried
    /// window; `span` is that span's full extent.
    Text {
        range: Range<usize>,
        span: Range<usize>,
        kind: SpanKind,
    },
    /// A block separator position.
    Separator { at: usize },
}

impl Document {
    /// Parse annotated markup into a live document. An optional metadata
    /// header is stripped and kept for export.
    pub fn from_markup(label: impl Into<String>, source: &str) -> Self {
        let label = label.into();
        let mut parser = Parser::new(&label);
        let parsed = parser.parse(source);

        Self {
            label,
            version: 0,
            spans: parsed.document,
            comments: parsed.comments,
            metadata: parsed.metadata,
            ids: parser.into_ids(),
        }
    }

    /// Build a fresh document from plain text; everything starts `Original`.
    pub fn from_plain(label: impl Into<String>, text: &str) -> Self {
        let label = label.into();
        let ids = IdGenerator::new(&label);

        Self {
            label,
            version: 0,
            spans: SpanDocument::from_plain(text),
            comments: CommentStore::new(),
            metadata: Vec::new(),
            ids,
        }
    }

    /// Apply a mutation atomically: all ops, one normalization, orphan
    /// pruning, version bump. A failed op rolls the whole batch back.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<u64, MutationError> {
        let checkpoint = self.spans.clone();

        if let Err(err) = mutation.apply(&mut self.spans) {
            self.spans = checkpoint;
            return Err(err);
        }

        self.spans.normalize();
        self.comments.retain_changes(&self.spans.change_ids());
        self.version += 1;
        Ok(self.version)
    }

    /// Register a comment-store change in the version counter.
    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }

    /// Replace document state from an undo snapshot.
    pub(crate) fn restore(&mut self, spans: SpanDocument, comments: CommentStore) {
        self.spans = spans;
        self.comments = comments;
        self.version += 1;
    }

    /// The full addressable text, struck runs included.
    pub fn content(&self) -> String {
        self.spans.full_text()
    }

    /// Total addressable length in characters.
    pub fn char_len(&self) -> usize {
        self.spans.char_len()
    }

    /// Per-range status view for the editing widget.
    pub fn status_in(&self, range: Range<usize>) -> Vec<StatusRun> {
        status_runs(&self.spans, range)
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    pub fn spans(&self) -> &SpanDocument {
        &self.spans
    }

    /// Document body as markup, without the metadata header.
    pub fn to_markup(&self) -> String {
        serialize(&self.spans, &self.comments)
    }

    /// Markup with the metadata header regenerated: custom fields kept,
    /// change counts recomputed.
    pub fn export_markup(&self) -> String {
        let counts = metadata::change_counts(&self.spans, &self.comments);
        let fields = metadata::export_fields(&self.metadata, counts);
        let mut out = metadata::render_header(&fields);
        out.push_str(&self.to_markup());
        out
    }
}

/// Status runs overlapping `range`, in document order.
pub(crate) fn status_runs(doc: &SpanDocument, range: Range<usize>) -> Vec<StatusRun> {
    let mut runs = Vec::new();
    let mut start = 0;
    let last = doc.blocks.len().saturating_sub(1);
    for (i, block) in doc.blocks.iter().enumerate() {
        let mut pos = start;
        for span in &block.spans {
            let end = pos + span.char_len();
            let lo = range.start.max(pos);
            let hi = range.end.min(end);
            if lo < hi {
                runs.push(StatusRun::Text {
                    range: lo..hi,
                    span: pos..end,
                    kind: span.kind.clone(),
                });
            }
            pos = end;
        }
        if i < last && range.contains(&pos) {
            runs.push(StatusRun::Separator { at: pos });
        }
        start = pos + 1;
    }
    runs
}

/// Global ranges of every span carrying `id`, in document order.
pub(crate) fn ranges_of(doc: &SpanDocument, id: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    for block in &doc.blocks {
        for span in &block.spans {
            let end = pos + span.char_len();
            if span.kind.change_id() == Some(id) {
                ranges.push(pos..end);
            }
            pos = end;
        }
        pos += 1;
    }
    ranges
}

/// Status of the change with `id`, from its first span.
pub(crate) fn kind_of(doc: &SpanDocument, id: &str) -> Option<SpanKind> {
    for block in &doc.blocks {
        for span in &block.spans {
            if span.kind.change_id() == Some(id) {
                return Some(span.kind.clone());
            }
        }
    }
    None
}
