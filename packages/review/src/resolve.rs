//! Whole-document change resolution.
//!
//! Two terminal projections of a review: accept everything or reject
//! everything. Both produce plain text with no tokens and no comments;
//! highlighted text survives either way, it was never a content change.

use redline_markup::document::{BlockKind, SpanDocument, SpanKind};

/// Final text with every change applied: insertions kept, deletions gone,
/// substitutions resolved to their new side.
pub fn accept_all(doc: &SpanDocument) -> String {
    render(doc, |kind| !kind.is_deleted())
}

/// Final text with every change discarded: deletions restored, insertions
/// dropped, substitutions resolved to their old side.
pub fn reject_all(doc: &SpanDocument) -> String {
    render(doc, |kind| !kind.is_inserted())
}

fn render(doc: &SpanDocument, keep: impl Fn(&SpanKind) -> bool) -> String {
    let mut blocks = Vec::with_capacity(doc.blocks.len());
    for block in &doc.blocks {
        let mut text = String::new();
        if let BlockKind::Heading(level) = block.kind {
            for _ in 0..level {
                text.push('#');
            }
            text.push(' ');
        }
        for span in &block.spans {
            if keep(&span.kind) {
                text.push_str(&span.text);
            }
        }
        blocks.push(text);
    }
    blocks.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_markup::parse;

    fn doc(source: &str) -> SpanDocument {
        parse(source).document
    }

    #[test]
    fn test_accept_keeps_insertions_and_drops_deletions() {
        let d = doc("The {--old--}{++new++} way");
        assert_eq!(accept_all(&d), "The new way");
    }

    #[test]
    fn test_reject_restores_the_original() {
        let d = doc("The {--old--}{++new++} way");
        assert_eq!(reject_all(&d), "The old way");
    }

    #[test]
    fn test_substitution_resolves_to_one_side() {
        let d = doc("{~~cold~>warm~~} start");
        assert_eq!(accept_all(&d), "warm start");
        assert_eq!(reject_all(&d), "cold start");
    }

    #[test]
    fn test_highlight_text_survives_both_ways() {
        let d = doc("a {==b==}{>>note<<} c");
        assert_eq!(accept_all(&d), "a b c");
        assert_eq!(reject_all(&d), "a b c");
    }

    #[test]
    fn test_heading_prefixes_are_preserved() {
        let d = doc("## Title {++!++}\nbody");
        assert_eq!(accept_all(&d), "## Title !\nbody");
        assert_eq!(reject_all(&d), "## Title \nbody");
    }

    #[test]
    fn test_untouched_document_passes_through() {
        let d = doc("# Plain\nnothing tracked");
        assert_eq!(accept_all(&d), "# Plain\nnothing tracked");
        assert_eq!(reject_all(&d), accept_all(&d));
    }
}
