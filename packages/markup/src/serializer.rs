//! Span document back to markup text.
//!
//! Serialization is the inverse of parsing on well-formed state: one token
//! per span, except that a deletion immediately followed by its linked
//! insertion folds into a single substitution token. Comment threads are
//! emitted right after the final token of the change they annotate, so a
//! change split across several fragments carries its comments once.

use crate::comment::CommentStore;
use crate::document::{Block, BlockKind, SpanDocument, SpanKind};
use std::collections::HashMap;

pub struct Serializer<'a> {
    doc: &'a SpanDocument,
    comments: &'a CommentStore,
    /// Final (block, span) position of every change id.
    last_span: HashMap<&'a str, (usize, usize)>,
}

impl<'a> Serializer<'a> {
    pub fn new(doc: &'a SpanDocument, comments: &'a CommentStore) -> Self {
        let mut last_span = HashMap::new();
        for (b, block) in doc.blocks.iter().enumerate() {
            for (s, span) in block.spans.iter().enumerate() {
                if let Some(id) = span.kind.change_id() {
                    last_span.insert(id, (b, s));
                }
            }
        }
        Self {
            doc,
            comments,
            last_span,
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (b, block) in self.doc.blocks.iter().enumerate() {
            if b > 0 {
                out.push('\n');
            }
            self.serialize_block(b, block, &mut out);
        }
        out
    }

    fn serialize_block(&self, block_idx: usize, block: &Block, out: &mut String) {
        if let BlockKind::Heading(level) = block.kind {
            for _ in 0..level {
                out.push('#');
            }
            out.push(' ');
        }

        let mut i = 0;
        while i < block.spans.len() {
            let span = &block.spans[i];
            match &span.kind {
                SpanKind::Original => out.push_str(&span.text),
                SpanKind::Deleted { id, .. } => {
                    if let Some((ins_text, ins_id)) = substitution_partner(block, i) {
                        out.push_str("{~~");
                        out.push_str(&span.text);
                        out.push_str("~>");
                        out.push_str(ins_text);
                        out.push_str("~~}");
                        self.emit_comments(id, (block_idx, i), out);
                        self.emit_comments(ins_id, (block_idx, i + 1), out);
                        i += 2;
                        continue;
                    }
                    out.push_str("{--");
                    out.push_str(&span.text);
                    out.push_str("--}");
                    self.emit_comments(id, (block_idx, i), out);
                }
                SpanKind::Inserted { id, .. } => {
                    out.push_str("{++");
                    out.push_str(&span.text);
                    out.push_str("++}");
                    self.emit_comments(id, (block_idx, i), out);
                }
                SpanKind::Highlight { id } => {
                    out.push_str("{==");
                    out.push_str(&span.text);
                    out.push_str("==}");
                    self.emit_comments(id, (block_idx, i), out);
                }
            }
            i += 1;
        }
    }

    /// Append the comment tokens for `id` when `at` is its final span.
    fn emit_comments(&self, id: &str, at: (usize, usize), out: &mut String) {
        if self.last_span.get(id) != Some(&at) {
            return;
        }
        for thread in self.comments.get(id) {
            out.push_str("{>>");
            out.push_str(&thread.text);
            out.push_str("<<}");
        }
    }
}

/// The immediately following insertion span, when it completes a
/// substitution pair with the deletion at `i`.
fn substitution_partner(block: &Block, i: usize) -> Option<(&str, &str)> {
    let SpanKind::Deleted {
        id,
        paired_with: Some(ins_id),
    } = &block.spans[i].kind
    else {
        return None;
    };
    let next = block.spans.get(i + 1)?;
    match &next.kind {
        SpanKind::Inserted {
            id: next_id,
            paired_with: Some(back),
        } if next_id == ins_id && back == id => Some((next.text.as_str(), next_id.as_str())),
        _ => None,
    }
}

/// Convenience wrapper over `Serializer`.
pub fn serialize(doc: &SpanDocument, comments: &CommentStore) -> String {
    Serializer::new(doc, comments).serialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::CommentThread;
    use crate::document::Span;
    use crate::parser::parse;

    fn reserialize(text: &str) -> String {
        let parsed = parse(text);
        serialize(&parsed.document, &parsed.comments)
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(reserialize("one\ntwo"), "one\ntwo");
    }

    #[test]
    fn test_change_tokens_round_trip() {
        let cases = [
            "a {--cut--} b",
            "a {++add++} b",
            "{~~cold~>warm~~}",
            "x {==marked==} y",
            "# Heading {++new++}",
            "## Two\nplain\n### Three",
        ];
        for case in cases {
            assert_eq!(reserialize(case), case, "case: {case}");
        }
    }

    #[test]
    fn test_comment_follows_its_change() {
        assert_eq!(
            reserialize("{--cut--}{>>why?<<} rest"),
            "{--cut--}{>>why?<<} rest"
        );
    }

    #[test]
    fn test_comment_moves_to_final_fragment() {
        // The comment was written mid-document but its change continues
        // into the next block; serialization re-anchors it at the end.
        let out = reserialize("{--one--}{>>note<<}\nx");
        assert_eq!(out, "{--one--}{>>note<<}\nx");

        let moved = reserialize("{--one--}\n{--two--}{>>note<<}");
        assert_eq!(moved, "{--one--}\n{--two--}{>>note<<}");
    }

    #[test]
    fn test_substitution_pair_folds_into_one_token() {
        let parsed = parse("{~~a~>b~~}{>>check<<}");
        let out = serialize(&parsed.document, &parsed.comments);
        assert_eq!(out, "{~~a~>b~~}{>>check<<}");
    }

    #[test]
    fn test_unlinked_adjacent_spans_stay_separate() {
        let doc = SpanDocument {
            blocks: vec![Block {
                kind: BlockKind::Paragraph,
                spans: vec![
                    Span::new("a".to_string(), SpanKind::deleted("d1".to_string())),
                    Span::new("b".to_string(), SpanKind::inserted("i1".to_string())),
                ],
            }],
        };
        let out = serialize(&doc, &CommentStore::new());
        assert_eq!(out, "{--a--}{++b++}");
    }

    #[test]
    fn test_half_linked_spans_stay_separate() {
        // A dangling pair link on one side only must not fold.
        let doc = SpanDocument {
            blocks: vec![Block {
                kind: BlockKind::Paragraph,
                spans: vec![
                    Span::new(
                        "a".to_string(),
                        SpanKind::Deleted {
                            id: "d1".to_string(),
                            paired_with: Some("i1".to_string()),
                        },
                    ),
                    Span::new("b".to_string(), SpanKind::inserted("i1".to_string())),
                ],
            }],
        };
        let out = serialize(&doc, &CommentStore::new());
        assert_eq!(out, "{--a--}{++b++}");
    }

    #[test]
    fn test_multi_block_highlight_round_trips() {
        let text = "{==part one==}\n{==part two==}{>>stitched<<}";
        assert_eq!(reserialize(text), text);

        // Both fragments share one id, so the comment attaches to the
        // highlight as a whole and re-emits after the final fragment.
        let parsed = parse(text);
        let ids = parsed.document.change_ids();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_heading_prefix_outside_token_stream() {
        let doc = SpanDocument {
            blocks: vec![Block {
                kind: BlockKind::Heading(3),
                spans: vec![Span::original("deep title")],
            }],
        };
        assert_eq!(serialize(&doc, &CommentStore::new()), "### deep title");
    }

    #[test]
    fn test_comments_emitted_in_order() {
        let mut comments = CommentStore::new();
        comments.add(
            "d1",
            CommentThread::new("t1".to_string(), "first".to_string(), 0),
        );
        comments.add(
            "d1",
            CommentThread::new("t2".to_string(), "second".to_string(), 0),
        );
        let doc = SpanDocument {
            blocks: vec![Block {
                kind: BlockKind::Paragraph,
                spans: vec![Span::new(
                    "x".to_string(),
                    SpanKind::deleted("d1".to_string()),
                )],
            }],
        };
        assert_eq!(
            serialize(&doc, &comments),
            "{--x--}{>>first<<}{>>second<<}"
        );
    }

    #[test]
    fn test_reserialization_is_stable() {
        let source = "Notes: keep\n\n# Title\nbody {~~a~>b~~}{>>hm<<} tail\n{--gone--}";
        let first = reserialize(source);
        let second = reserialize(&first);
        assert_eq!(first, second);
    }
}
