//! Optional `Key: value` header block at the top of a markup file.
//!
//! ```text
//! Changes: 3
//! Commented: 1
//! Uncommented: 2
//!
//! Document body starts here.
//! ```
//! The header is recognized strictly: every line before the first blank
//! line must be a field, or nothing is treated as a header at all.

use crate::comment::CommentStore;
use crate::document::{SpanDocument, SpanKind};
use std::collections::BTreeMap;

pub const CHANGES_FIELD: &str = "Changes";
pub const COMMENTED_FIELD: &str = "Commented";
pub const UNCOMMENTED_FIELD: &str = "Uncommented";

/// Split a leading metadata header from `text`. Returns the parsed fields
/// and the document body. The blank terminator line is consumed with the
/// header; a header that runs to end of input leaves an empty body.
pub fn parse_header(text: &str) -> (Vec<(String, String)>, &str) {
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let line_end = text[pos..].find('\n').map(|i| pos + i);
        let line = match line_end {
            Some(end) => &text[pos..end],
            None => &text[pos..],
        };

        if line.is_empty() {
            return match line_end {
                _ if fields.is_empty() => (Vec::new(), text),
                Some(end) => (fields, &text[end + 1..]),
                None => (fields, ""),
            };
        }

        match parse_field(line) {
            Some(field) => fields.push(field),
            // One non-field line before the blank: not a header after all.
            None => return (Vec::new(), text),
        }

        match line_end {
            Some(end) => pos = end + 1,
            None => return (fields, ""),
        }
    }
    (fields, "")
}

/// Parse one `Key: value` line. Keys start with a letter and may contain
/// letters, digits, spaces, hyphens and underscores.
fn parse_field(line: &str) -> Option<(String, String)> {
    let colon = line.find(':')?;
    let key = &line[..colon];
    let mut chars = key.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_') {
        return None;
    }
    let value = line[colon + 1..].trim().to_string();
    Some((key.trim_end().to_string(), value))
}

/// Render header fields as `Key: value` lines plus the blank terminator.
/// Empty input renders nothing.
pub fn render_header(fields: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    if !fields.is_empty() {
        out.push('\n');
    }
    out
}

/// Change totals for the exported header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeCounts {
    pub total: usize,
    pub commented: usize,
}

impl ChangeCounts {
    pub fn uncommented(&self) -> usize {
        self.total - self.commented
    }
}

/// Count the changes in a document. A substitution pair counts once, under
/// its deletion-side id, and is commented when either side carries threads.
pub fn change_counts(document: &SpanDocument, comments: &CommentStore) -> ChangeCounts {
    let mut units: BTreeMap<String, bool> = BTreeMap::new();
    for block in &document.blocks {
        for span in &block.spans {
            let Some(id) = span.kind.change_id() else {
                continue;
            };
            let canonical = match &span.kind {
                SpanKind::Inserted {
                    paired_with: Some(partner),
                    ..
                } => partner.clone(),
                _ => id.to_string(),
            };
            let commented = units.entry(canonical).or_insert(false);
            *commented |= comments.has_threads(id);
        }
    }

    let commented = units.values().filter(|&&c| c).count();
    ChangeCounts {
        total: units.len(),
        commented,
    }
}

fn is_count_field(key: &str) -> bool {
    matches!(key, CHANGES_FIELD | COMMENTED_FIELD | UNCOMMENTED_FIELD)
}

/// Header fields for export: custom fields pass through, the three count
/// fields are regenerated.
pub fn export_fields(custom: &[(String, String)], counts: ChangeCounts) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = custom
        .iter()
        .filter(|(key, _)| !is_count_field(key))
        .cloned()
        .collect();
    fields.push((CHANGES_FIELD.to_string(), counts.total.to_string()));
    fields.push((COMMENTED_FIELD.to_string(), counts.commented.to_string()));
    fields.push((
        UNCOMMENTED_FIELD.to_string(),
        counts.uncommented().to_string(),
    ));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::CommentThread;
    use crate::document::{Block, Span};

    #[test]
    fn test_parse_header_strips_fields_and_blank() {
        let (fields, body) = parse_header("Changes: 2\nAuthor: sam\n\nThe body.");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], ("Changes".to_string(), "2".to_string()));
        assert_eq!(fields[1], ("Author".to_string(), "sam".to_string()));
        assert_eq!(body, "The body.");
    }

    #[test]
    fn test_non_field_line_means_no_header() {
        let text = "Changes: 2\nnot a field\n\nbody";
        let (fields, body) = parse_header(text);
        assert!(fields.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "Just an ordinary paragraph.";
        let (fields, body) = parse_header(text);
        assert!(fields.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_header_to_end_of_input() {
        let (fields, body) = parse_header("Changes: 0");
        assert_eq!(fields.len(), 1);
        assert_eq!(body, "");
    }

    #[test]
    fn test_leading_blank_line_is_content() {
        let text = "\nbody";
        let (fields, body) = parse_header(text);
        assert!(fields.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_key_with_spaces() {
        let (fields, body) = parse_header("Last Edited: yesterday\n\nx");
        assert_eq!(fields[0].0, "Last Edited");
        assert_eq!(fields[0].1, "yesterday");
        assert_eq!(body, "x");
    }

    #[test]
    fn test_render_header_round_trips() {
        let fields = vec![
            ("Changes".to_string(), "1".to_string()),
            ("Commented".to_string(), "0".to_string()),
        ];
        let rendered = render_header(&fields);
        assert_eq!(rendered, "Changes: 1\nCommented: 0\n\n");

        let (parsed, rest) = parse_header(&rendered);
        assert_eq!(parsed, fields);
        assert_eq!(rest, "");
    }

    #[test]
    fn test_change_counts_substitution_counts_once() {
        let doc = SpanDocument {
            blocks: vec![Block {
                kind: crate::document::BlockKind::Paragraph,
                spans: vec![
                    Span::new(
                        "old".to_string(),
                        SpanKind::Deleted {
                            id: "d1".to_string(),
                            paired_with: Some("i1".to_string()),
                        },
                    ),
                    Span::new(
                        "new".to_string(),
                        SpanKind::Inserted {
                            id: "i1".to_string(),
                            paired_with: Some("d1".to_string()),
                        },
                    ),
                    Span::new("x".to_string(), SpanKind::highlight("h1".to_string())),
                ],
            }],
        };

        let mut comments = CommentStore::new();
        comments.add(
            "i1",
            CommentThread::new("t1".to_string(), "why?".to_string(), 0),
        );

        let counts = change_counts(&doc, &comments);
        assert_eq!(counts.total, 2);
        // A thread on the insertion side marks the whole pair commented.
        assert_eq!(counts.commented, 1);
        assert_eq!(counts.uncommented(), 1);
    }

    #[test]
    fn test_export_fields_refreshes_counts() {
        let custom = vec![
            ("Author".to_string(), "sam".to_string()),
            ("Changes".to_string(), "99".to_string()),
        ];
        let fields = export_fields(
            &custom,
            ChangeCounts {
                total: 2,
                commented: 1,
            },
        );
        assert_eq!(
            fields,
            vec![
                ("Author".to_string(), "sam".to_string()),
                ("Changes".to_string(), "2".to_string()),
                ("Commented".to_string(), "1".to_string()),
                ("Uncommented".to_string(), "1".to_string()),
            ]
        );
    }
}
