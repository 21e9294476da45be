//! # Redline Editor
//!
//! Core tracked-editing engine for Redline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: annotated text → span store         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document lifecycle + mutations      │
//! │  - Intercept raw edits, emit tracked ops    │
//! │  - Apply mutations with validation          │
//! │  - Comments, highlights, reverts            │
//! │  - Snapshot-based undo/redo                 │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ review: change index + resolution           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Spans are source of truth**: markup text and change lists are
//!    derived views
//! 2. **Edits are intents**: the engine decides what each keystroke means
//!    under tracking, the widget never does
//! 3. **Nothing is lost while tracking**: deletions mark, insertions are
//!    attributed, only one's own insertions are ever removed
//! 4. **Validate then apply**: mutations are checked against the store
//!    before any state changes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redline_editor::{EditIntent, EditSession, EditorOptions};
//!
//! let mut session = EditSession::open(
//!     "report",
//!     "The {--quick--} brown fox",
//!     EditorOptions::default(),
//! );
//!
//! // Type at the caret; the engine turns it into a tracked insertion
//! session.set_selection(4, 4);
//! let change = session.apply_intent(&EditIntent::Insert {
//!     at: 4,
//!     text: "very ".to_string(),
//! });
//!
//! // Comment on it, think better of it, put it back
//! if let Some(id) = change {
//!     session.add_comment(&id, "is this stronger?")?;
//!     session.revert(&id)?;
//! }
//!
//! let markup = session.export();
//! ```

mod comments;
mod document;
mod engine;
mod errors;
mod mutations;
mod options;
mod session;
mod undo_stack;

pub use document::{Document, StatusRun};
pub use engine::{plan, EditIntent, EditPlan, Selection};
pub use errors::{EditResult, EditorError};
pub use mutations::{Mutation, MutationError, SpanOp};
pub use options::EditorOptions;
pub use session::EditSession;
pub use undo_stack::{Snapshot, UndoEntry, UndoStack};

// Re-export common types for convenience
pub use redline_markup::{CommentStore, CommentThread, SpanDocument, SpanKind};
