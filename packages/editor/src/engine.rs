//! # Intercept/Transform Engine
//!
//! Turns raw edit intents into tracked mutations.
//!
//! The engine sits between an intent producer (the editing widget) and the
//! span store. For each intent it emits at most one [`Mutation`] plus the
//! cursor position the widget should adopt. It holds no state of its own;
//! tracking behavior comes entirely from [`EditorOptions`].
//!
//! ## Interception rules
//!
//! - Typing inside or against one's own insertion grows that insertion
//!   untracked; growing a paired span dissolves its substitution link
//! - Typing over plain text creates a fresh `Inserted` span; a point inside
//!   a struck run is first relocated past the run
//! - A single delete marks plain text `Deleted`, reusing the id of an
//!   adjacent unpaired struck span so backspace runs merge into one span;
//!   deleting inside one's own insertion removes the text for real and
//!   dissolves any substitution link
//! - Deleting on already-struck text only moves the cursor past the run
//! - Deleting a selection decomposes it: own insertions are removed, plain
//!   text is marked with one shared id, struck text and highlights stay
//! - Replacing a selection additionally inserts the replacement right after
//!   the final marked fragment and links the two ids as a substitution
//!
//! Invalid positions never escape as errors; the engine logs and returns a
//! cursor-only plan.

use crate::document::{status_runs, StatusRun};
use crate::mutations::{Mutation, SpanOp};
use crate::options::EditorOptions;
use redline_markup::document::{Block, CharPos, SpanDocument, SpanKind};
use redline_markup::IdGenerator;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::warn;

/// A normalized edit intent from the editing widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EditIntent {
    Insert { at: usize, text: String },
    Delete { range: Range<usize> },
    Replace { range: Range<usize>, text: String },
}

/// Anchor/head selection. `head` is the moving end and decides delete
/// direction: a unit delete ending at the head is a backspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.anchor == self.head
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// What one intent turns into.
#[derive(Debug, Clone)]
pub struct EditPlan {
    /// The mutation to apply, when the intent changes state at all.
    pub mutation: Option<Mutation>,

    /// Where the cursor lands.
    pub cursor: usize,

    /// The change the edit created or grew.
    pub change_id: Option<String>,
}

impl EditPlan {
    fn cursor_only(cursor: usize) -> Self {
        Self {
            mutation: None,
            cursor,
            change_id: None,
        }
    }

    pub fn mutated(&self) -> bool {
        self.mutation.is_some()
    }
}

/// Transform one intent into a plan against the current store.
pub fn plan(
    doc: &SpanDocument,
    selection: Selection,
    intent: &EditIntent,
    options: &EditorOptions,
    ids: &mut IdGenerator,
) -> EditPlan {
    match intent {
        EditIntent::Insert { at, text } => plan_insert(doc, selection, *at, text, options, ids),
        EditIntent::Delete { range } => plan_delete(doc, selection, range.clone(), options, ids),
        EditIntent::Replace { range, text } => {
            plan_replace(doc, selection, range.clone(), text, options, ids)
        }
    }
}

fn plan_insert(
    doc: &SpanDocument,
    selection: Selection,
    at: usize,
    text: &str,
    options: &EditorOptions,
    ids: &mut IdGenerator,
) -> EditPlan {
    let len = doc.char_len();
    if text.is_empty() {
        return EditPlan::cursor_only(selection.head.min(len));
    }
    if at > len {
        warn!("insert position {at} outside document of length {len}");
        return EditPlan::cursor_only(selection.head.min(len));
    }

    if !options.track_changes {
        let (ops, cursor) = segmented_insert(at, text, SpanKind::Original);
        return EditPlan {
            mutation: Some(Mutation::new(ops, "insert text")),
            cursor,
            change_id: None,
        };
    }

    // New text never lands between struck characters; it goes after the run.
    let at = relocated_insert_point(doc, at);

    if text.contains('\n') {
        let id = ids.next_id();
        let (ops, cursor) = segmented_insert(at, text, SpanKind::inserted(id.clone()));
        return EditPlan {
            mutation: Some(Mutation::new(ops, "paste text")),
            cursor,
            change_id: Some(id),
        };
    }

    if let Some((id, paired)) = extension_target(doc, at) {
        let mut ops = Vec::new();
        if paired {
            ops.push(SpanOp::Unpair { id: id.clone() });
        }
        ops.push(SpanOp::InsertText {
            at,
            text: text.to_string(),
            kind: SpanKind::inserted(id.clone()),
        });
        return EditPlan {
            mutation: Some(Mutation::new(ops, "insert text")),
            cursor: at + text.chars().count(),
            change_id: Some(id),
        };
    }

    let id = ids.next_id();
    EditPlan {
        mutation: Some(Mutation::new(
            vec![SpanOp::InsertText {
                at,
                text: text.to_string(),
                kind: SpanKind::inserted(id.clone()),
            }],
            "insert text",
        )),
        cursor: at + text.chars().count(),
        change_id: Some(id),
    }
}

fn plan_delete(
    doc: &SpanDocument,
    selection: Selection,
    range: Range<usize>,
    options: &EditorOptions,
    ids: &mut IdGenerator,
) -> EditPlan {
    let len = doc.char_len();
    if range.start > range.end || range.end > len {
        warn!(
            "delete range {}..{} outside document of length {len}",
            range.start, range.end
        );
        return EditPlan::cursor_only(selection.head.min(len));
    }
    if range.is_empty() {
        return EditPlan::cursor_only(range.start);
    }

    if !options.track_changes {
        return EditPlan {
            mutation: Some(Mutation::new(
                vec![SpanOp::RemoveText {
                    range: range.clone(),
                }],
                "delete",
            )),
            cursor: range.start,
            change_id: None,
        };
    }

    if range.end - range.start == 1 {
        let forward = range.start == selection.head;
        plan_unit_delete(doc, range.start, forward, ids)
    } else {
        plan_selection_delete(doc, range, ids)
    }
}

fn plan_unit_delete(
    doc: &SpanDocument,
    cell: usize,
    forward: bool,
    ids: &mut IdGenerator,
) -> EditPlan {
    let Some(located) = doc.locate(cell) else {
        return EditPlan::cursor_only(cell);
    };

    let pos = match located {
        // The dialect cannot mark a removed break, so separator deletes
        // stay structural even while tracking.
        CharPos::Separator { .. } => {
            return EditPlan {
                mutation: Some(Mutation::new(
                    vec![SpanOp::JoinBlocks { at: cell }],
                    "join blocks",
                )),
                cursor: cell,
                change_id: None,
            };
        }
        CharPos::Text(pos) => pos,
    };

    let block = &doc.blocks[pos.block];
    let base = doc.block_start(pos.block);
    let Some((span_idx, _)) = block.span_at(pos.offset) else {
        return EditPlan::cursor_only(cell);
    };
    let span = &block.spans[span_idx];

    match &span.kind {
        SpanKind::Original => {
            let id = adjacent_deleted_id(block, pos.offset, forward)
                .unwrap_or_else(|| ids.next_id());
            EditPlan {
                mutation: Some(Mutation::new(
                    vec![SpanOp::MarkDeleted {
                        range: cell..cell + 1,
                        id: id.clone(),
                        paired_with: None,
                    }],
                    "delete",
                )),
                cursor: if forward { cell + 1 } else { cell },
                change_id: Some(id),
            }
        }

        // Already struck: only the cursor moves, past the whole run.
        SpanKind::Deleted { .. } => {
            let run = run_extent(block, pos.offset, SpanKind::is_deleted);
            EditPlan::cursor_only(base + if forward { run.end } else { run.start })
        }

        // Highlights anchor commentary and resist deletion.
        SpanKind::Highlight { .. } => {
            let run = run_extent(block, pos.offset, SpanKind::is_highlight);
            EditPlan::cursor_only(base + if forward { run.end } else { run.start })
        }

        SpanKind::Inserted { id, paired_with } => {
            let mut ops = vec![SpanOp::RemoveText {
                range: cell..cell + 1,
            }];
            if paired_with.is_some() {
                ops.push(SpanOp::Unpair { id: id.clone() });
            }
            EditPlan {
                mutation: Some(Mutation::new(ops, "delete")),
                cursor: cell,
                change_id: None,
            }
        }
    }
}

fn plan_selection_delete(doc: &SpanDocument, range: Range<usize>, ids: &mut IdGenerator) -> EditPlan {
    let (marks, removals) = decompose(doc, &range);
    if marks.is_empty() && removals.is_empty() {
        return EditPlan::cursor_only(range.end);
    }

    let mut ops = Vec::new();
    let mut change_id = None;
    if !marks.is_empty() {
        let id = ids.next_id();
        for r in &marks {
            ops.push(SpanOp::MarkDeleted {
                range: r.clone(),
                id: id.clone(),
                paired_with: None,
            });
        }
        change_id = Some(id);
    }

    let removed = push_removals(&mut ops, &removals);

    EditPlan {
        mutation: Some(Mutation::new(ops, "delete selection")),
        cursor: range.end - removed,
        change_id,
    }
}

fn plan_replace(
    doc: &SpanDocument,
    selection: Selection,
    range: Range<usize>,
    text: &str,
    options: &EditorOptions,
    ids: &mut IdGenerator,
) -> EditPlan {
    if text.is_empty() {
        return plan_delete(doc, selection, range, options, ids);
    }
    if range.is_empty() {
        return plan_insert(doc, selection, range.start, text, options, ids);
    }

    let len = doc.char_len();
    if range.start > range.end || range.end > len {
        warn!(
            "replace range {}..{} outside document of length {len}",
            range.start, range.end
        );
        return EditPlan::cursor_only(selection.head.min(len));
    }

    if !options.track_changes {
        let mut ops = vec![SpanOp::RemoveText {
            range: range.clone(),
        }];
        let (insert_ops, cursor) = segmented_insert(range.start, text, SpanKind::Original);
        ops.extend(insert_ops);
        return EditPlan {
            mutation: Some(Mutation::new(ops, "replace")),
            cursor,
            change_id: None,
        };
    }

    let (marks, removals) = decompose(doc, &range);

    let del_id = (!marks.is_empty()).then(|| ids.next_id());
    let ins_id = ids.next_id();

    let mut ops = Vec::new();
    if let Some(del_id) = &del_id {
        for r in &marks {
            ops.push(SpanOp::MarkDeleted {
                range: r.clone(),
                id: del_id.clone(),
                paired_with: Some(ins_id.clone()),
            });
        }
    }

    // The replacement goes right after the final marked fragment so the
    // pair stays adjacent in the serialized form; with nothing marked it
    // goes after whatever survives the selection.
    let raw_at = marks.last().map(|r| r.end).unwrap_or(range.end);
    let shift: usize = removals
        .iter()
        .filter(|(r, ..)| r.end <= raw_at)
        .map(|(r, ..)| r.end - r.start)
        .sum();

    push_removals(&mut ops, &removals);

    let kind = SpanKind::Inserted {
        id: ins_id.clone(),
        paired_with: del_id.clone(),
    };
    let (insert_ops, cursor) = segmented_insert(raw_at - shift, text, kind);
    ops.extend(insert_ops);

    EditPlan {
        mutation: Some(Mutation::new(ops, "replace selection")),
        cursor,
        change_id: del_id.or(Some(ins_id)),
    }
}

/// An `Inserted` piece to remove: covered range, id, pair state.
type Removal = (Range<usize>, String, bool);

/// Marked-vs-removed decomposition of a selection: the `Original`
/// sub-ranges to strike and the `Inserted` pieces to remove. Struck text,
/// highlights and separators fall through untouched.
fn decompose(doc: &SpanDocument, range: &Range<usize>) -> (Vec<Range<usize>>, Vec<Removal>) {
    let mut marks = Vec::new();
    let mut removals = Vec::new();
    for run in status_runs(doc, range.clone()) {
        let StatusRun::Text { range, kind, .. } = run else {
            continue;
        };
        match kind {
            SpanKind::Original => marks.push(range),
            SpanKind::Inserted { id, paired_with } => {
                removals.push((range, id, paired_with.is_some()));
            }
            _ => {}
        }
    }
    (marks, removals)
}

/// Emit removal ops right to left so earlier coordinates stay valid, with
/// an unpair wherever the removal touches a paired insertion. Returns the
/// total character count removed.
fn push_removals(ops: &mut Vec<SpanOp>, removals: &[Removal]) -> usize {
    for (range, id, paired) in removals.iter().rev() {
        ops.push(SpanOp::RemoveText {
            range: range.clone(),
        });
        if *paired {
            ops.push(SpanOp::Unpair { id: id.clone() });
        }
    }
    removals.iter().map(|(r, ..)| r.end - r.start).sum()
}

/// Ops for a possibly multi-line insertion, plus the final cursor. Line
/// breaks become block splits; every text segment carries `kind`.
fn segmented_insert(at: usize, text: &str, kind: SpanKind) -> (Vec<SpanOp>, usize) {
    let mut ops = Vec::new();
    let mut pos = at;
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            ops.push(SpanOp::SplitBlock { at: pos });
            pos += 1;
        }
        if !part.is_empty() {
            ops.push(SpanOp::InsertText {
                at: pos,
                text: part.to_string(),
                kind: kind.clone(),
            });
            pos += part.chars().count();
        }
    }
    (ops, pos)
}

/// A point strictly between struck characters moves to the end of the run.
fn relocated_insert_point(doc: &SpanDocument, at: usize) -> usize {
    let Some(pos) = doc.resolve_point(at) else {
        return at;
    };
    let block = &doc.blocks[pos.block];
    let prev = pos.offset.checked_sub(1).and_then(|o| block.kind_at(o));
    let next = block.kind_at(pos.offset);
    match (prev, next) {
        (Some(p), Some(n)) if p.is_deleted() && n.is_deleted() => {
            let run = run_extent(block, pos.offset, SpanKind::is_deleted);
            doc.block_start(pos.block) + run.end
        }
        _ => at,
    }
}

/// The insertion span a point can grow, with its pair state. The span
/// ending at the point wins over one starting there.
fn extension_target(doc: &SpanDocument, at: usize) -> Option<(String, bool)> {
    let pos = doc.resolve_point(at)?;
    let block = &doc.blocks[pos.block];

    let prev = pos.offset.checked_sub(1).and_then(|o| block.kind_at(o));
    if let Some(SpanKind::Inserted { id, paired_with }) = prev {
        return Some((id.clone(), paired_with.is_some()));
    }

    let next = block.kind_at(pos.offset);
    if let Some(SpanKind::Inserted { id, paired_with }) = next {
        return Some((id.clone(), paired_with.is_some()));
    }
    None
}

/// The id to continue when striking a character next to an existing
/// unpaired struck span. Backspace runs leave the earlier mark to the
/// right, forward runs to the left, so that side is checked first.
fn adjacent_deleted_id(block: &Block, offset: usize, forward: bool) -> Option<String> {
    let left = offset.checked_sub(1).and_then(|o| block.kind_at(o));
    let right = block.kind_at(offset + 1);
    let (first, second) = if forward { (left, right) } else { (right, left) };
    for kind in [first, second].into_iter().flatten() {
        if let SpanKind::Deleted {
            id,
            paired_with: None,
        } = kind
        {
            return Some(id.clone());
        }
    }
    None
}

/// Block-local extent of the contiguous run of spans matching `pred`
/// around `offset`, regardless of ids.
fn run_extent(block: &Block, offset: usize, pred: impl Fn(&SpanKind) -> bool) -> Range<usize> {
    let mut bounds = Vec::new();
    let mut pos = 0;
    for span in &block.spans {
        let end = pos + span.char_len();
        bounds.push((pos..end, pred(&span.kind)));
        pos = end;
    }
    let Some(seed) = bounds
        .iter()
        .position(|(r, matches)| *matches && r.contains(&offset))
    else {
        return offset..offset;
    };

    let mut first = seed;
    while first > 0 && bounds[first - 1].1 {
        first -= 1;
    }
    let mut last = seed;
    while last + 1 < bounds.len() && bounds[last + 1].1 {
        last += 1;
    }
    bounds[first].0.start..bounds[last].0.end
}
