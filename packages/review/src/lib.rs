//! # Redline Review
//!
//! Read-only projections of a tracked document for review surfaces.
//!
//! ## Features
//!
//! - **Change Index**: flattens spans into positioned change records with
//!   comment threads and display context
//! - **Substitution folding**: a linked deletion/insertion pair projects
//!   as one record with both texts
//! - **Resolution**: `accept_all` / `reject_all` collapse the document to
//!   final plain text
//!
//! ## Example
//!
//! ```rust
//! use redline_markup::parse;
//! use redline_review::{ChangeIndex, ChangeKind};
//!
//! let parsed = parse("A {--B--}{>>why<<} C");
//! let index = ChangeIndex::build(&parsed.document, &parsed.comments, 30);
//!
//! assert_eq!(index.len(), 1);
//! let record = &index.records()[0];
//! assert_eq!(record.kind, ChangeKind::Deletion { text: "B".to_string() });
//! assert_eq!(record.comments[0].text, "why");
//! ```

pub mod change_index;
pub mod resolve;

pub use change_index::{ChangeIndex, ChangeKind, ChangeRecord};
pub use resolve::{accept_all, reject_all};
