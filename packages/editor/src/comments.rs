//! Comment anchoring rules.

use crate::document::kind_of;
use crate::errors::{EditResult, EditorError};
use redline_markup::document::{SpanDocument, SpanKind};

/// Check that `change_id` can carry a comment thread.
///
/// Deletions and highlights always can, insertions only while unpaired. A
/// substitution's commentary lives on its deletion side, which is where
/// the serialized form anchors it.
pub(crate) fn validate_anchor(doc: &SpanDocument, change_id: &str) -> EditResult<()> {
    match kind_of(doc, change_id) {
        None => Err(EditorError::ChangeNotFound(change_id.to_string())),
        Some(SpanKind::Inserted {
            paired_with: Some(_),
            ..
        }) => Err(EditorError::NotCommentable(change_id.to_string())),
        Some(_) => Ok(()),
    }
}
