//! Markup text to span document.
//!
//! Parsing is total: malformed tokens fall back to literal text and every
//! input produces a document. Each change token gets a fresh id, except
//! where a change continues across a block boundary (a change token ending
//! one block followed by a same-family token starting the next keeps a
//! single id, which is how multi-block changes round-trip).

use crate::comment::{CommentStore, CommentThread};
use crate::document::{Block, BlockKind, Span, SpanDocument, SpanKind};
use crate::id_generator::IdGenerator;
use crate::metadata;
use crate::tokenizer::{tokenize_line, Token};

/// Everything a markup file carries.
#[derive(Debug)]
pub struct ParsedMarkup {
    pub document: SpanDocument,
    pub comments: CommentStore,
    pub metadata: Vec<(String, String)>,
}

/// The change token ending a block, eligible to continue into the next.
#[derive(Debug, Clone)]
enum SeamEnd {
    Deleted { id: String },
    Inserted { id: String },
    Substitution { ins_id: String },
    Highlight { id: String },
}

pub struct Parser {
    ids: IdGenerator,
}

impl Parser {
    pub fn new(label: &str) -> Self {
        Self {
            ids: IdGenerator::new(label),
        }
    }

    /// Continue an existing id sequence, for re-imports into a live editor.
    pub fn with_ids(ids: IdGenerator) -> Self {
        Self { ids }
    }

    /// The generator, carrying on after whatever ids parsing handed out.
    pub fn into_ids(self) -> IdGenerator {
        self.ids
    }

    pub fn parse(&mut self, text: &str) -> ParsedMarkup {
        let (fields, content) = metadata::parse_header(text);
        let mut comments = CommentStore::new();
        let mut blocks = Vec::new();
        let mut last_change: Option<String> = None;
        let mut seam: Option<SeamEnd> = None;

        for line in content.split('\n') {
            let (kind, body) = split_heading(line);
            let tokens = tokenize_line(body);
            blocks.push(self.build_block(kind, &tokens, &mut comments, &mut last_change, &mut seam));
        }

        let mut document = SpanDocument { blocks };
        document.normalize();
        ParsedMarkup {
            document,
            comments,
            metadata: fields,
        }
    }

    fn build_block(
        &mut self,
        kind: BlockKind,
        tokens: &[Token],
        comments: &mut CommentStore,
        last_change: &mut Option<String>,
        seam: &mut Option<SeamEnd>,
    ) -> Block {
        let mut block = Block::new(kind);
        // The carried id applies only to a token at the very start of the
        // block; an empty block or leading text breaks the continuation.
        let mut carried = seam.take();
        let mut ending = None;

        for token in tokens {
            ending = match token {
                Token::Text(text) => {
                    block.spans.push(Span::original(text));
                    None
                }
                Token::Deletion(text) => self.push_deletion(&mut block, text, carried.take(), last_change),
                Token::Insertion(text) => self.push_insertion(&mut block, text, carried.take(), last_change),
                Token::Substitution { old, new } => {
                    self.push_substitution(&mut block, old, new, carried.take(), last_change)
                }
                Token::Highlight(text) => self.push_highlight(&mut block, text, carried.take(), last_change),
                Token::Comment(text) => {
                    self.push_comment(&mut block, text, comments, last_change);
                    None
                }
            };
            carried = None;
        }

        *seam = ending;
        block
    }

    fn push_deletion(
        &mut self,
        block: &mut Block,
        text: &str,
        carried: Option<SeamEnd>,
        last_change: &mut Option<String>,
    ) -> Option<SeamEnd> {
        if text.is_empty() {
            return None;
        }
        let id = match carried {
            Some(SeamEnd::Deleted { id }) => id,
            _ => self.ids.next_id(),
        };
        block
            .spans
            .push(Span::new(text.to_string(), SpanKind::deleted(id.clone())));
        *last_change = Some(id.clone());
        Some(SeamEnd::Deleted { id })
    }

    fn push_insertion(
        &mut self,
        block: &mut Block,
        text: &str,
        carried: Option<SeamEnd>,
        last_change: &mut Option<String>,
    ) -> Option<SeamEnd> {
        if text.is_empty() {
            return None;
        }
        let id = match carried {
            Some(SeamEnd::Inserted { id }) => id,
            // The replacement side of a substitution may spill into the
            // next block as a plain insertion token.
            Some(SeamEnd::Substitution { ins_id }) => ins_id,
            _ => self.ids.next_id(),
        };
        block
            .spans
            .push(Span::new(text.to_string(), SpanKind::inserted(id.clone())));
        *last_change = Some(id.clone());
        Some(SeamEnd::Inserted { id })
    }

    fn push_substitution(
        &mut self,
        block: &mut Block,
        old: &str,
        new: &str,
        carried: Option<SeamEnd>,
        last_change: &mut Option<String>,
    ) -> Option<SeamEnd> {
        // Degenerate sides collapse to a plain change of the other family.
        if old.is_empty() {
            return self.push_insertion(block, new, carried, last_change);
        }
        if new.is_empty() {
            return self.push_deletion(block, old, carried, last_change);
        }

        // A deletion spilling over from the previous block keeps its id as
        // the pair's deletion side.
        let del_id = match carried {
            Some(SeamEnd::Deleted { id }) => id,
            _ => self.ids.next_id(),
        };
        let ins_id = self.ids.next_id();

        block.spans.push(Span::new(
            old.to_string(),
            SpanKind::Deleted {
                id: del_id.clone(),
                paired_with: Some(ins_id.clone()),
            },
        ));
        block.spans.push(Span::new(
            new.to_string(),
            SpanKind::Inserted {
                id: ins_id.clone(),
                paired_with: Some(del_id.clone()),
            },
        ));
        // Comments after a substitution anchor on its deletion side.
        *last_change = Some(del_id);
        Some(SeamEnd::Substitution { ins_id })
    }

    fn push_highlight(
        &mut self,
        block: &mut Block,
        text: &str,
        carried: Option<SeamEnd>,
        last_change: &mut Option<String>,
    ) -> Option<SeamEnd> {
        if text.is_empty() {
            return None;
        }
        let id = match carried {
            Some(SeamEnd::Highlight { id }) => id,
            _ => self.ids.next_id(),
        };
        block
            .spans
            .push(Span::new(text.to_string(), SpanKind::highlight(id.clone())));
        *last_change = Some(id.clone());
        Some(SeamEnd::Highlight { id })
    }

    fn push_comment(
        &mut self,
        block: &mut Block,
        text: &str,
        comments: &mut CommentStore,
        last_change: &Option<String>,
    ) {
        match last_change {
            Some(anchor) => {
                let thread = CommentThread::new(self.ids.next_id(), text.to_string(), 0);
                comments.add(anchor, thread);
            }
            // Nothing to attach to: keep the token as literal text.
            None => block
                .spans
                .push(Span::original(&format!("{{>>{}<<}}", text))),
        }
    }
}

/// Split a leading heading prefix (one to six `#` plus a space) from the
/// line body.
fn split_heading(line: &str) -> (BlockKind, &str) {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        if let Some(body) = line[hashes..].strip_prefix(' ') {
            return (BlockKind::Heading(hashes as u8), body);
        }
    }
    (BlockKind::Paragraph, line)
}

/// Parse with a throwaway id seed. Callers that keep editing the document
/// should build a `Parser` and keep its generator.
pub fn parse(text: &str) -> ParsedMarkup {
    let mut parser = Parser::new("untitled");
    parser.parse(text)
}
