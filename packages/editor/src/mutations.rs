//! # Span Store Mutations
//!
//! Primitive operations on span documents.
//!
//! ## Design Principles
//!
//! 1. **Validated**: Every op checks its positions before touching state
//! 2. **Status-safe**: Marking ops never change visible character content
//! 3. **Minimal**: The intercept engine composes these; no op encodes policy
//! 4. **Batched**: A `Mutation` groups the ops of one user-visible edit
//!
//! ## Op Semantics
//!
//! ### Mark ops
//! - `MarkDeleted`/`MarkHighlight` retag `Original` characters only;
//!   other statuses and block separators inside the range are untouched
//! - `ClearMarks` restores `Deleted`/`Highlight` characters to `Original`
//!
//! ### Content ops
//! - `InsertText` splices a single-line span at a position
//! - `RemoveText` removes every character in a range, separators included
//!   (removing a separator joins the blocks around it)
//!
//! ### Structural ops
//! - `SplitBlock`/`JoinBlocks` move block boundaries without retagging
//! - `Unpair` dissolves a substitution link by id

use redline_markup::document::{CharPos, SpanDocument, SpanKind};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// One primitive rewrite of the span store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SpanOp {
    /// Insert `text` at a position as its own span, splitting if needed
    InsertText {
        at: usize,
        text: String,
        kind: SpanKind,
    },

    /// Retag `Original` characters in the range as `Deleted`
    MarkDeleted {
        range: Range<usize>,
        id: String,
        paired_with: Option<String>,
    },

    /// Retag `Original` characters in the range as `Highlight`
    MarkHighlight { range: Range<usize>, id: String },

    /// Restore `Deleted`/`Highlight` characters in the range to `Original`
    ClearMarks { range: Range<usize> },

    /// Truly remove the characters in the range
    RemoveText { range: Range<usize> },

    /// Split the block containing the position; the tail keeps the kind
    SplitBlock { at: usize },

    /// Remove the separator at the position, concatenating its blocks
    JoinBlocks { at: usize },

    /// Drop the substitution link on `id` and on its partner
    Unpair { id: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("position {pos} is past the end of the document ({len})")]
    PositionOutOfBounds { pos: usize, len: usize },

    #[error("range {start}..{end} does not fit the document ({len})")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("inserted text may not contain a line break")]
    MultilineText,

    #[error("position {pos} is not on a block separator")]
    NotASeparator { pos: usize },
}

impl SpanOp {
    /// Apply the op with validation. Ops mutate in place; batch atomicity
    /// is the document handle's job.
    pub fn apply(&self, doc: &mut SpanDocument) -> Result<(), MutationError> {
        self.validate(doc)?;

        match self {
            SpanOp::InsertText { at, text, kind } => {
                if text.is_empty() {
                    return Ok(());
                }
                let Some(pos) = doc.resolve_point(*at) else {
                    return Err(MutationError::PositionOutOfBounds {
                        pos: *at,
                        len: doc.char_len(),
                    });
                };
                doc.blocks[pos.block].insert(pos.offset, text, kind.clone());
                Ok(())
            }

            SpanOp::MarkDeleted {
                range,
                id,
                paired_with,
            } => {
                retag_range(doc, range, |kind| {
                    if kind.is_original() {
                        *kind = SpanKind::Deleted {
                            id: id.clone(),
                            paired_with: paired_with.clone(),
                        };
                    }
                });
                Ok(())
            }

            SpanOp::MarkHighlight { range, id } => {
                retag_range(doc, range, |kind| {
                    if kind.is_original() {
                        *kind = SpanKind::Highlight { id: id.clone() };
                    }
                });
                Ok(())
            }

            SpanOp::ClearMarks { range } => {
                retag_range(doc, range, |kind| {
                    if kind.is_deleted() || kind.is_highlight() {
                        *kind = SpanKind::Original;
                    }
                });
                Ok(())
            }

            SpanOp::RemoveText { range } => {
                remove_range(doc, range);
                Ok(())
            }

            SpanOp::SplitBlock { at } => {
                let Some(pos) = doc.resolve_point(*at) else {
                    return Err(MutationError::PositionOutOfBounds {
                        pos: *at,
                        len: doc.char_len(),
                    });
                };
                doc.split_block(pos);
                Ok(())
            }

            SpanOp::JoinBlocks { at } => {
                let Some(CharPos::Separator { after_block }) = doc.locate(*at) else {
                    return Err(MutationError::NotASeparator { pos: *at });
                };
                doc.join_blocks(after_block);
                Ok(())
            }

            SpanOp::Unpair { id } => {
                doc.unpair(id);
                Ok(())
            }
        }
    }

    /// Validate without applying.
    pub fn validate(&self, doc: &SpanDocument) -> Result<(), MutationError> {
        let len = doc.char_len();
        match self {
            SpanOp::InsertText { at, text, .. } => {
                if text.contains('\n') {
                    return Err(MutationError::MultilineText);
                }
                check_pos(*at, len)
            }
            SpanOp::MarkDeleted { range, .. }
            | SpanOp::MarkHighlight { range, .. }
            | SpanOp::ClearMarks { range }
            | SpanOp::RemoveText { range } => check_range(range, len),
            SpanOp::SplitBlock { at } => check_pos(*at, len),
            SpanOp::JoinBlocks { at } => match doc.locate(*at) {
                Some(CharPos::Separator { .. }) => Ok(()),
                _ => Err(MutationError::NotASeparator { pos: *at }),
            },
            SpanOp::Unpair { .. } => Ok(()),
        }
    }
}

/// One user-visible edit: a batch of ops applied and undone together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mutation {
    pub ops: Vec<SpanOp>,
    pub label: String,
}

impl Mutation {
    pub fn new(ops: Vec<SpanOp>, label: impl Into<String>) -> Self {
        Self {
            ops,
            label: label.into(),
        }
    }

    /// Apply every op in order. Stops at the first failure; the caller is
    /// responsible for rolling back partially applied batches.
    pub fn apply(&self, doc: &mut SpanDocument) -> Result<(), MutationError> {
        for op in &self.ops {
            op.apply(doc)?;
        }
        Ok(())
    }
}

fn check_pos(pos: usize, len: usize) -> Result<(), MutationError> {
    if pos <= len {
        Ok(())
    } else {
        Err(MutationError::PositionOutOfBounds { pos, len })
    }
}

fn check_range(range: &Range<usize>, len: usize) -> Result<(), MutationError> {
    if range.start <= range.end && range.end <= len {
        Ok(())
    } else {
        Err(MutationError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len,
        })
    }
}

/// Run `retag` over every span at least partly inside `range`, splitting
/// spans at the range edges first so the retag lands exactly.
fn retag_range(doc: &mut SpanDocument, range: &Range<usize>, mut retag: impl FnMut(&mut SpanKind)) {
    let mut start = 0;
    for block in &mut doc.blocks {
        let len = block.char_len();
        let lo = range.start.max(start);
        let hi = range.end.min(start + len);
        if lo < hi {
            let window = block.isolate(lo - start..hi - start);
            for span in &mut block.spans[window] {
                retag(&mut span.kind);
            }
        }
        start += len + 1;
    }
}

/// Remove a global range: per-block content first, then covered separators
/// from right to left so block indices stay valid.
fn remove_range(doc: &mut SpanDocument, range: &Range<usize>) {
    let mut joins = Vec::new();
    let mut start = 0;
    let last = doc.blocks.len().saturating_sub(1);
    for (i, block) in doc.blocks.iter_mut().enumerate() {
        let len = block.char_len();
        let lo = range.start.max(start);
        let hi = range.end.min(start + len);
        if lo < hi {
            block.remove(lo - start..hi - start);
        }
        let sep = start + len;
        if i < last && range.contains(&sep) {
            joins.push(i);
        }
        start = sep + 1;
    }
    for &i in joins.iter().rev() {
        doc.join_blocks(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_markup::parse;

    fn store(text: &str) -> SpanDocument {
        parse(text).document
    }

    #[test]
    fn test_insert_splits_original_span() {
        let mut doc = store("Hello world");
        let op = SpanOp::InsertText {
            at: 5,
            text: " there".to_string(),
            kind: SpanKind::inserted("i1".to_string()),
        };
        op.apply(&mut doc).unwrap();

        let spans = &doc.blocks[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, " there");
        assert!(spans[1].kind.is_inserted());
        assert_eq!(doc.full_text(), "Hello there world");
    }

    #[test]
    fn test_insert_rejects_line_breaks() {
        let mut doc = store("ab");
        let op = SpanOp::InsertText {
            at: 1,
            text: "x\ny".to_string(),
            kind: SpanKind::Original,
        };
        assert_eq!(op.apply(&mut doc), Err(MutationError::MultilineText));
        assert_eq!(doc.full_text(), "ab");
    }

    #[test]
    fn test_mark_deleted_skips_other_statuses() {
        let mut doc = store("ab {++cd++} ef");
        let op = SpanOp::MarkDeleted {
            range: 0..doc.char_len(),
            id: "d1".to_string(),
            paired_with: None,
        };
        op.apply(&mut doc).unwrap();
        doc.normalize();

        let kinds: Vec<bool> = doc.blocks[0]
            .spans
            .iter()
            .map(|s| s.kind.is_deleted())
            .collect();
        assert_eq!(kinds, vec![true, false, true]);
        // Visible content unchanged by a status-only op.
        assert_eq!(doc.full_text(), "ab cd ef");
    }

    #[test]
    fn test_mark_range_crossing_separator_leaves_it() {
        let mut doc = store("ab\ncd");
        let op = SpanOp::MarkDeleted {
            range: 0..5,
            id: "d1".to_string(),
            paired_with: None,
        };
        op.apply(&mut doc).unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert!(doc.blocks[0].spans[0].kind.is_deleted());
        assert!(doc.blocks[1].spans[0].kind.is_deleted());
        assert_eq!(doc.full_text(), "ab\ncd");
    }

    #[test]
    fn test_clear_marks_restores_original() {
        let mut doc = store("a {--bc--} d");
        let op = SpanOp::ClearMarks {
            range: 0..doc.char_len(),
        };
        op.apply(&mut doc).unwrap();
        doc.normalize();

        assert_eq!(doc.blocks[0].spans.len(), 1);
        assert!(doc.blocks[0].spans[0].kind.is_original());
    }

    #[test]
    fn test_remove_across_separator_joins_blocks() {
        let mut doc = store("abc\ndef");
        let op = SpanOp::RemoveText { range: 2..5 };
        op.apply(&mut doc).unwrap();
        doc.normalize();

        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.full_text(), "abef");
    }

    #[test]
    fn test_remove_whole_document() {
        let mut doc = store("abc\ndef");
        let op = SpanOp::RemoveText { range: 0..7 };
        op.apply(&mut doc).unwrap();
        doc.normalize();

        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.full_text(), "");
    }

    #[test]
    fn test_join_requires_separator() {
        let mut doc = store("ab\ncd");
        assert!(SpanOp::JoinBlocks { at: 2 }.apply(&mut doc).is_ok());
        assert_eq!(doc.blocks.len(), 1);

        let mut doc = store("ab\ncd");
        assert_eq!(
            SpanOp::JoinBlocks { at: 1 }.apply(&mut doc),
            Err(MutationError::NotASeparator { pos: 1 })
        );
    }

    #[test]
    fn test_split_block_keeps_kind() {
        let mut doc = store("# Title text");
        SpanOp::SplitBlock { at: 8 }.apply(&mut doc).unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].kind, doc.blocks[1].kind);
    }

    #[test]
    fn test_unpair_clears_both_sides() {
        let mut doc = store("{~~old~>new~~}");
        let del_id = doc.blocks[0].spans[0]
            .kind
            .change_id()
            .map(str::to_string)
            .unwrap();

        SpanOp::Unpair { id: del_id }.apply(&mut doc).unwrap();

        for span in &doc.blocks[0].spans {
            assert_eq!(span.kind.paired_with(), None);
        }
    }

    #[test]
    fn test_out_of_bounds_positions_rejected() {
        let mut doc = store("abc");
        let op = SpanOp::InsertText {
            at: 9,
            text: "x".to_string(),
            kind: SpanKind::Original,
        };
        assert!(matches!(
            op.apply(&mut doc),
            Err(MutationError::PositionOutOfBounds { pos: 9, .. })
        ));

        let op = SpanOp::RemoveText { range: 1..9 };
        assert!(matches!(
            op.apply(&mut doc),
            Err(MutationError::RangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::new(
            vec![
                SpanOp::MarkDeleted {
                    range: 4..8,
                    id: "d1".to_string(),
                    paired_with: Some("i1".to_string()),
                },
                SpanOp::InsertText {
                    at: 8,
                    text: "new".to_string(),
                    kind: SpanKind::Inserted {
                        id: "i1".to_string(),
                        paired_with: Some("d1".to_string()),
                    },
                },
            ],
            "replace selection",
        );

        let json = serde_json::to_string(&mutation).unwrap();
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();

        assert_eq!(mutation, deserialized);
    }
}
