//! Data model and wire format for tracked-change documents.
//!
//! A document is a list of blocks, each holding a run of spans that carry
//! their review status inline. This crate owns that model plus the text
//! codec for it: `parser` turns annotated markup into a [`SpanDocument`]
//! with its comment threads and metadata, and `serializer` writes the
//! same form back out. Parsing is total; any input produces a document.

pub mod comment;
pub mod document;
pub mod id_generator;
pub mod metadata;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use comment::{CommentStore, CommentThread};
pub use document::{Block, BlockKind, BlockPos, CharPos, Span, SpanDocument, SpanKind};
pub use id_generator::IdGenerator;
pub use parser::{parse, ParsedMarkup, Parser};
pub use serializer::{serialize, Serializer};
