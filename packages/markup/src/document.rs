use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// Revision status of a run of characters.
///
/// A `Deleted` and an `Inserted` span produced by one replace operation
/// reference each other through `paired_with`; such a pair reads as a single
/// substitution wherever changes are listed or serialized. Any later edit
/// that dissolves one side of the pair must clear the link on the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum SpanKind {
    /// Base text, untouched since import.
    Original,
    /// Struck text: still present in the document, marked for removal.
    Deleted {
        id: String,
        paired_with: Option<String>,
    },
    /// Text added since the base revision.
    Inserted {
        id: String,
        paired_with: Option<String>,
    },
    /// Reviewer highlight over base text.
    Highlight { id: String },
}

impl SpanKind {
    pub fn deleted(id: String) -> Self {
        SpanKind::Deleted {
            id,
            paired_with: None,
        }
    }

    pub fn inserted(id: String) -> Self {
        SpanKind::Inserted {
            id,
            paired_with: None,
        }
    }

    pub fn highlight(id: String) -> Self {
        SpanKind::Highlight { id }
    }

    /// Id of the change this status belongs to, if any.
    pub fn change_id(&self) -> Option<&str> {
        match self {
            SpanKind::Original => None,
            SpanKind::Deleted { id, .. }
            | SpanKind::Inserted { id, .. }
            | SpanKind::Highlight { id } => Some(id),
        }
    }

    /// Id of the paired counterpart for substitution halves.
    pub fn paired_with(&self) -> Option<&str> {
        match self {
            SpanKind::Deleted { paired_with, .. } | SpanKind::Inserted { paired_with, .. } => {
                paired_with.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_original(&self) -> bool {
        matches!(self, SpanKind::Original)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, SpanKind::Deleted { .. })
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, SpanKind::Inserted { .. })
    }

    pub fn is_highlight(&self) -> bool {
        matches!(self, SpanKind::Highlight { .. })
    }
}

/// A run of characters sharing one revision status.
///
/// Span text is never empty and never contains a line break; `normalize`
/// restores the no-empty-span rule after edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub kind: SpanKind,
}

impl Span {
    pub fn new(text: String, kind: SpanKind) -> Self {
        Self { text, kind }
    }

    pub fn original(text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind: SpanKind::Original,
        }
    }

    /// Length in characters, the unit every offset in the model uses.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Paragraph-level container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    /// Heading with level 1 through 6.
    Heading(u8),
}

/// One paragraph or heading: an ordered list of spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            spans: Vec::new(),
        }
    }

    pub fn paragraph() -> Self {
        Self::new(BlockKind::Paragraph)
    }

    /// Total character length of the block content.
    pub fn char_len(&self) -> usize {
        self.spans.iter().map(Span::char_len).sum()
    }

    /// All span text concatenated, struck runs included.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Index of the span containing `offset`, together with the span's own
    /// start offset. `None` when `offset` is at or past the end.
    pub fn span_at(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (i, span) in self.spans.iter().enumerate() {
            let len = span.char_len();
            if offset < start + len {
                return Some((i, start));
            }
            start += len;
        }
        None
    }

    /// Revision status of the character at `offset`.
    pub fn kind_at(&self, offset: usize) -> Option<&SpanKind> {
        self.span_at(offset).map(|(i, _)| &self.spans[i].kind)
    }

    /// Splice `text` into the block at `offset` as its own span.
    pub fn insert(&mut self, offset: usize, text: &str, kind: SpanKind) {
        let at = self.split_at(offset);
        self.spans.insert(at, Span::new(text.to_string(), kind));
    }

    /// Split spans so `offset` falls on a span boundary. Returns the index
    /// of the first span at or after the boundary.
    pub fn split_at(&mut self, offset: usize) -> usize {
        match self.span_at(offset) {
            Some((i, start)) if offset == start => i,
            Some((i, start)) => {
                let tail = split_text_at(&mut self.spans[i].text, offset - start);
                let kind = self.spans[i].kind.clone();
                self.spans.insert(i + 1, Span::new(tail, kind));
                i + 1
            }
            None => self.spans.len(),
        }
    }

    /// Split spans at both ends of `range` and return the span index range
    /// exactly covering it.
    pub fn isolate(&mut self, range: Range<usize>) -> Range<usize> {
        let start = self.split_at(range.start);
        let end = self.split_at(range.end);
        start..end
    }

    /// Remove the characters in `range`, splitting spans as needed.
    pub fn remove(&mut self, range: Range<usize>) {
        let idx = self.isolate(range);
        self.spans.drain(idx);
    }

    /// Split off the spans from `offset` to the end of the block.
    pub fn split_off(&mut self, offset: usize) -> Vec<Span> {
        let at = self.split_at(offset);
        self.spans.split_off(at)
    }

    /// Merge adjacent spans with identical status and drop empty spans.
    pub fn normalize(&mut self) {
        self.spans.retain(|s| !s.text.is_empty());
        let mut i = 1;
        while i < self.spans.len() {
            if self.spans[i].kind == self.spans[i - 1].kind {
                let tail = self.spans.remove(i);
                self.spans[i - 1].text.push_str(&tail.text);
            } else {
                i += 1;
            }
        }
    }
}

/// Split a string at a character offset, leaving the head in place.
fn split_text_at(text: &mut String, at: usize) -> String {
    let byte = text
        .char_indices()
        .nth(at)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    text.split_off(byte)
}

/// A block index and a character offset inside that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPos {
    pub block: usize,
    pub offset: usize,
}

/// Classification of one addressable character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharPos {
    /// A character inside a block.
    Text(BlockPos),
    /// The separator between `after_block` and its successor.
    Separator { after_block: usize },
}

/// The whole tracked document: blocks joined by implicit one-character
/// separators.
///
/// Offsets address characters: block content first, then one separator
/// position between consecutive blocks. Heading prefixes are display-only
/// and take no positions. A document always has at least one block; the
/// empty document is a single empty paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanDocument {
    pub blocks: Vec<Block>,
}

impl SpanDocument {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::paragraph()],
        }
    }

    /// Build from plain text: one paragraph per line, everything `Original`.
    pub fn from_plain(text: &str) -> Self {
        let blocks = text
            .split('\n')
            .map(|line| {
                let mut block = Block::paragraph();
                if !line.is_empty() {
                    block.spans.push(Span::original(line));
                }
                block
            })
            .collect();
        Self { blocks }
    }

    /// Total addressable length: block contents plus one position per
    /// separator.
    pub fn char_len(&self) -> usize {
        let content: usize = self.blocks.iter().map(Block::char_len).sum();
        content + self.blocks.len().saturating_sub(1)
    }

    /// Global offset of the first character of `block`.
    pub fn block_start(&self, block: usize) -> usize {
        self.blocks[..block].iter().map(|b| b.char_len() + 1).sum()
    }

    /// Resolve a cursor position to a block and in-block offset. A position
    /// on a separator resolves to the end of the block before it.
    pub fn resolve_point(&self, pos: usize) -> Option<BlockPos> {
        let mut start = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            let len = block.char_len();
            if pos <= start + len {
                return Some(BlockPos {
                    block: i,
                    offset: pos - start,
                });
            }
            start += len + 1;
        }
        None
    }

    /// Classify the character at `pos` as block text or a separator.
    pub fn locate(&self, pos: usize) -> Option<CharPos> {
        let mut start = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            let len = block.char_len();
            if pos < start + len {
                return Some(CharPos::Text(BlockPos {
                    block: i,
                    offset: pos - start,
                }));
            }
            if pos == start + len && i + 1 < self.blocks.len() {
                return Some(CharPos::Separator { after_block: i });
            }
            start += len + 1;
        }
        None
    }

    /// Status of the character at `pos`. Separators have no status.
    pub fn kind_at(&self, pos: usize) -> Option<&SpanKind> {
        match self.locate(pos)? {
            CharPos::Text(p) => self.blocks[p.block].kind_at(p.offset),
            CharPos::Separator { .. } => None,
        }
    }

    /// Split the block containing `at` in two. The tail keeps the kind.
    pub fn split_block(&mut self, at: BlockPos) {
        let tail = self.blocks[at.block].split_off(at.offset);
        let kind = self.blocks[at.block].kind;
        self.blocks.insert(at.block + 1, Block { kind, spans: tail });
    }

    /// Join `after_block` with its successor. The left block's kind wins.
    pub fn join_blocks(&mut self, after_block: usize) {
        let right = self.blocks.remove(after_block + 1);
        self.blocks[after_block].spans.extend(right.spans);
    }

    /// Clear the substitution link on `id` and on whatever points at it.
    pub fn unpair(&mut self, id: &str) {
        for block in &mut self.blocks {
            for span in &mut block.spans {
                match &mut span.kind {
                    SpanKind::Deleted {
                        id: own,
                        paired_with,
                    }
                    | SpanKind::Inserted {
                        id: own,
                        paired_with,
                    } => {
                        if own == id || paired_with.as_deref() == Some(id) {
                            *paired_with = None;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Ids of every change and highlight still present in the document.
    pub fn change_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for block in &self.blocks {
            for span in &block.spans {
                if let Some(id) = span.kind.change_id() {
                    ids.insert(id.to_string());
                }
            }
        }
        ids
    }

    /// The full addressable text: all span text with `\n` for separators.
    /// Its character count always equals `char_len`.
    pub fn full_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Restore span invariants after a batch of edits.
    pub fn normalize(&mut self) {
        for block in &mut self.blocks {
            block.normalize();
        }
        if self.blocks.is_empty() {
            self.blocks.push(Block::paragraph());
        }
    }
}

impl Default for SpanDocument {
    fn default() -> Self {
        Self::new()
    }
}
