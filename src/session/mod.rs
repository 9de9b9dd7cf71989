//! Edit session: buffered, unsaved record edits.
//!
//! The session maps `(collection, position)` to the full overridden record.
//! A present key means that position's authoritative content is the session
//! record, not whatever is on disk. Every field edit is also appended to a
//! bounded history (oldest evicted first).
//!
//! A collection is identified by its relative path, so the same key is used
//! whether the collection is currently read from the data root or from its
//! working copy under the reviewed root.
//!
//! The session has no internal locking. Callers sharing one session across
//! tasks must serialize access (the server holds it behind a mutex for the
//! duration of each request).

mod patch;
mod persist;
mod propagate;

pub use patch::{PatchOutcome, apply_patch};
pub use persist::{SaveOutcome, merge_with_disk, save_all, toggle_reviewed};
pub use propagate::propagate_role_change;

use crate::models::Record;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Maximum number of history entries kept.
pub const MAX_HISTORY: usize = 100;

/// One recorded field edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryEdit {
    /// Collection relative path
    pub collection: String,
    /// Position of the record within the collection
    pub position: usize,
    /// Record identifier at the time of the edit
    pub record_id: String,
    /// Dotted field path, e.g. `gold.slots.name` or `context[2].role`
    pub field_path: String,
    pub old_value: Value,
    pub new_value: Value,
    pub timestamp: DateTime<Local>,
}

/// Buffered edits and bounded edit history.
#[derive(Debug, Default)]
pub struct EditSession {
    unsaved: BTreeMap<(String, usize), Record>,
    history: VecDeque<EntryEdit>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session override for a position, if any.
    pub fn get_effective(&self, collection: &str, position: usize) -> Option<&Record> {
        self.unsaved.get(&(collection.to_string(), position))
    }

    /// Record a field edit and store the record's cumulative state.
    ///
    /// Multiple edits to the same position coalesce: the last `record`
    /// passed in becomes the override.
    pub fn record_change(
        &mut self,
        collection: &str,
        position: usize,
        field_path: &str,
        old_value: Value,
        new_value: Value,
        record: Record,
    ) {
        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(EntryEdit {
            collection: collection.to_string(),
            position,
            record_id: record.id().to_string(),
            field_path: field_path.to_string(),
            old_value,
            new_value,
            timestamp: Local::now(),
        });
        self.unsaved.insert((collection.to_string(), position), record);
    }

    /// Whether unsaved edits exist for `collection`, or at all when `None`.
    pub fn has_unsaved(&self, collection: Option<&str>) -> bool {
        match collection {
            Some(collection) => self.unsaved_for(collection).next().is_some(),
            None => !self.unsaved.is_empty(),
        }
    }

    /// Unsaved overrides of one collection, by ascending position.
    pub fn unsaved_for<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Record)> + 'a {
        self.unsaved
            .range((collection.to_string(), 0)..)
            .take_while(move |((name, _), _)| name == collection)
            .map(|((_, position), record)| (*position, record))
    }

    /// Number of buffered overrides across all collections.
    pub fn unsaved_count(&self) -> usize {
        self.unsaved.len()
    }

    /// Drop every override of `collection`. History is kept.
    pub fn mark_saved(&mut self, collection: &str) {
        self.unsaved.retain(|(name, _), _| name != collection);
    }

    /// Reset overrides and history.
    pub fn clear(&mut self) {
        self.unsaved.clear();
        self.history.clear();
    }

    /// Edit history, oldest first.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &EntryEdit> + ExactSizeIterator {
        self.history.iter()
    }
}
