//! Editor configuration.
//!
//! Passed into the engine explicitly; there is no global editor state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorOptions {
    /// When false, edits bypass interception entirely: insertions land as
    /// plain text and deletions remove content outright.
    pub track_changes: bool,

    /// Width of the surrounding-text window in change index records,
    /// in characters per side.
    pub context_chars: usize,

    /// Undo history depth. Zero means unlimited.
    pub max_undo_levels: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            track_changes: true,
            context_chars: 30,
            max_undo_levels: 100,
        }
    }
}
