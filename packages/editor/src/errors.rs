//! Error types for the editor

use thiserror::Error;

pub type EditResult<T> = Result<T, EditorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("mutation failed: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("no change with id {0}")]
    ChangeNotFound(String),

    #[error("no thread {thread_id} on change {change_id}")]
    CommentNotFound {
        change_id: String,
        thread_id: String,
    },

    #[error("change {0} cannot anchor comments")]
    NotCommentable(String),

    #[error("comment text is empty")]
    EmptyComment,

    #[error("highlights may only cover unmarked text")]
    InvalidHighlightTarget,
}
