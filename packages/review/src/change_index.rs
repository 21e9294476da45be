//! # Change Index
//!
//! Flattens the span store into discrete change records for navigation.
//!
//! The index is a pure projection: a single linear pass groups the
//! fragments of each change id into one record, resolves substitution
//! pairs, attaches live comment threads, and cuts a bounded window of
//! surrounding text for display. It is recomputed after every mutation and
//! never mutated itself.

use redline_markup::document::{SpanDocument, SpanKind};
use redline_markup::{CommentStore, CommentThread};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What one change did, with the text it affected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ChangeKind {
    Deletion { text: String },
    Insertion { text: String },
    Substitution { old: String, new: String },
    Highlight { text: String },
}

/// One logical edit, projected for display.
///
/// A record may cover several spans: substitution sides, or fragments of
/// one change split across blocks, which are stitched with a line break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The change id; for substitutions, the deletion side's id.
    pub id: String,

    pub kind: ChangeKind,

    /// Global character range from the first fragment to the last.
    pub start: usize,
    pub end: usize,

    /// Surrounding untracked text, at most the configured window.
    pub context_before: String,
    pub context_after: String,

    /// Live threads on this change, in creation order.
    pub comments: Vec<CommentThread>,
}

/// All changes in a document, ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeIndex {
    records: Vec<ChangeRecord>,
}

/// One span's worth of a change, with its global position.
struct Fragment {
    block: usize,
    start: usize,
    end: usize,
    text: String,
    kind: SpanKind,
}

struct Group {
    id: String,
    fragments: Vec<Fragment>,
}

impl ChangeIndex {
    /// Project the current spans and comments into records.
    ///
    /// `context_chars` bounds each context window; the windows skip over
    /// tracked spans so they always show text the reader keeps.
    pub fn build(doc: &SpanDocument, comments: &CommentStore, context_chars: usize) -> Self {
        let groups = collect_groups(doc);
        let visible = visible_chars(doc);

        let mut paired: HashMap<&str, usize> = HashMap::new();
        for (i, group) in groups.iter().enumerate() {
            paired.insert(group.id.as_str(), i);
        }

        let mut consumed = vec![false; groups.len()];
        let mut records = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            consumed[i] = true;

            let (kind, start, end) = match partner_of(group, &groups, &paired) {
                Some(p) => {
                    consumed[p] = true;
                    let partner = &groups[p];
                    (
                        ChangeKind::Substitution {
                            old: stitched_text(group),
                            new: stitched_text(partner),
                        },
                        group.start().min(partner.start()),
                        group.end().max(partner.end()),
                    )
                }
                None => {
                    let text = stitched_text(group);
                    let kind = match &group.fragments[0].kind {
                        SpanKind::Deleted { .. } => ChangeKind::Deletion { text },
                        SpanKind::Inserted { .. } => ChangeKind::Insertion { text },
                        SpanKind::Highlight { .. } => ChangeKind::Highlight { text },
                        SpanKind::Original => continue,
                    };
                    (kind, group.start(), group.end())
                }
            };

            records.push(ChangeRecord {
                id: group.id.clone(),
                kind,
                start,
                end,
                context_before: context_before(&visible, start, context_chars),
                context_after: context_after(&visible, end, context_chars),
                comments: comments.get(&group.id).to_vec(),
            });
        }

        records.sort_by_key(|r| r.start);
        debug!("indexed {} changes", records.len());
        Self { records }
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&ChangeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The whole index as JSON, for UI consumers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Group {
    fn start(&self) -> usize {
        self.fragments[0].start
    }

    fn end(&self) -> usize {
        self.fragments[self.fragments.len() - 1].end
    }
}

/// Gather every tracked span into per-id groups, in first-appearance order.
fn collect_groups(doc: &SpanDocument) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    let mut pos = 0;
    for (b, block) in doc.blocks.iter().enumerate() {
        for span in &block.spans {
            let end = pos + span.char_len();
            if let Some(id) = span.kind.change_id() {
                let fragment = Fragment {
                    block: b,
                    start: pos,
                    end,
                    text: span.text.clone(),
                    kind: span.kind.clone(),
                };
                match by_id.get(id) {
                    Some(&g) => groups[g].fragments.push(fragment),
                    None => {
                        by_id.insert(id.to_string(), groups.len());
                        groups.push(Group {
                            id: id.to_string(),
                            fragments: vec![fragment],
                        });
                    }
                }
            }
            pos = end;
        }
        pos += 1;
    }
    groups
}

/// The insertion group completing `group` as a substitution, if the pair
/// link is intact in both directions.
fn partner_of(group: &Group, groups: &[Group], by_id: &HashMap<&str, usize>) -> Option<usize> {
    let SpanKind::Deleted {
        id,
        paired_with: Some(partner),
    } = &group.fragments[0].kind
    else {
        return None;
    };
    let p = *by_id.get(partner.as_str())?;
    match &groups[p].fragments[0].kind {
        SpanKind::Inserted {
            paired_with: Some(back),
            ..
        } if back == id => Some(p),
        _ => None,
    }
}

/// A group's fragments as one string, with a line break wherever
/// consecutive fragments sit in different blocks.
fn stitched_text(group: &Group) -> String {
    let mut out = String::new();
    let mut last_block = None;
    for fragment in &group.fragments {
        if let Some(last) = last_block {
            if last != fragment.block {
                out.push('\n');
            }
        }
        out.push_str(&fragment.text);
        last_block = Some(fragment.block);
    }
    out
}

/// Per-position display characters: `Some` for text the reader keeps
/// (original and highlighted, separators as line breaks), `None` under
/// tracked spans.
fn visible_chars(doc: &SpanDocument) -> Vec<Option<char>> {
    let mut chars = Vec::with_capacity(doc.char_len());
    let last = doc.blocks.len().saturating_sub(1);
    for (b, block) in doc.blocks.iter().enumerate() {
        for span in &block.spans {
            let keep = matches!(
                span.kind,
                SpanKind::Original | SpanKind::Highlight { .. }
            );
            for ch in span.text.chars() {
                chars.push(keep.then_some(ch));
            }
        }
        if b < last {
            chars.push(Some('\n'));
        }
    }
    chars
}

fn context_before(visible: &[Option<char>], start: usize, limit: usize) -> String {
    let mut collected: Vec<char> = visible[..start.min(visible.len())]
        .iter()
        .rev()
        .filter_map(|c| *c)
        .take(limit)
        .collect();
    collected.reverse();
    collected.into_iter().collect()
}

fn context_after(visible: &[Option<char>], end: usize, limit: usize) -> String {
    visible[end.min(visible.len())..]
        .iter()
        .filter_map(|c| *c)
        .take(limit)
        .collect()
}
