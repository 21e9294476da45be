use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One reviewer note attached to a change or highlight.
///
/// Timestamps are epoch seconds. Imported markup carries no timestamps, so
/// parsed threads start at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentThread {
    pub id: String,
    pub text: String,
    pub created_at: u64,
    pub edited_at: Option<u64>,
}

impl CommentThread {
    pub fn new(id: String, text: String, created_at: u64) -> Self {
        Self {
            id,
            text,
            created_at,
            edited_at: None,
        }
    }
}

/// Comment threads keyed by the change id they annotate.
///
/// A `BTreeMap` keeps iteration deterministic so serialized output is
/// stable. Threads under one change keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentStore {
    threads: BTreeMap<String, Vec<CommentThread>>,
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a thread to `change_id`.
    pub fn add(&mut self, change_id: &str, thread: CommentThread) {
        self.threads
            .entry(change_id.to_string())
            .or_default()
            .push(thread);
    }

    /// Threads on `change_id`, oldest first. Empty when there are none.
    pub fn get(&self, change_id: &str) -> &[CommentThread] {
        self.threads.get(change_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rewrite the text of one thread. Returns false when the change or
    /// thread does not exist.
    pub fn edit(&mut self, change_id: &str, thread_id: &str, text: String, edited_at: u64) -> bool {
        let Some(threads) = self.threads.get_mut(change_id) else {
            return false;
        };
        match threads.iter_mut().find(|t| t.id == thread_id) {
            Some(thread) => {
                thread.text = text;
                thread.edited_at = Some(edited_at);
                true
            }
            None => false,
        }
    }

    /// Remove one thread. The change's entry is dropped when its last
    /// thread goes. Returns false when nothing matched.
    pub fn remove(&mut self, change_id: &str, thread_id: &str) -> bool {
        let Some(threads) = self.threads.get_mut(change_id) else {
            return false;
        };
        let before = threads.len();
        threads.retain(|t| t.id != thread_id);
        let removed = threads.len() < before;
        if threads.is_empty() {
            self.threads.remove(change_id);
        }
        removed
    }

    /// Drop every thread attached to `change_id`.
    pub fn remove_all(&mut self, change_id: &str) {
        self.threads.remove(change_id);
    }

    /// Drop threads whose change id is no longer in `live`.
    pub fn retain_changes(&mut self, live: &BTreeSet<String>) {
        self.threads.retain(|id, _| live.contains(id));
    }

    pub fn has_threads(&self, change_id: &str) -> bool {
        self.threads.contains_key(change_id)
    }

    /// Total thread count across all changes.
    pub fn len(&self) -> usize {
        self.threads.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
