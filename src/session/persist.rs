//! Reconciling buffered edits with disk.
//!
//! Both save paths write the merged, uncleaned records as the collection's
//! working copy under the reviewed root and then drop the collection's
//! overrides from the session. A failed write leaves the session untouched
//! apart from edits already recorded, so a save can simply be retried.

use super::EditSession;
use crate::models::Record;
use crate::storage::{read_jsonl, write_working_copy};
use crate::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Result of [`save_all`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing was buffered; no file was written.
    NoChanges,
    /// Buffered edits were written to the working copy at `path`.
    Saved { path: PathBuf },
}

/// Overlay the session overrides of `collection` on top of `disk`.
///
/// Overrides for positions past the end of `disk` are ignored.
pub fn merge_with_disk(session: &EditSession, collection: &str, mut disk: Vec<Record>) -> Vec<Record> {
    for (position, record) in session.unsaved_for(collection) {
        if let Some(slot) = disk.get_mut(position) {
            *slot = record.clone();
        }
    }
    disk
}

/// Flip the reviewed flag of one record and persist the collection.
///
/// All buffered edits of the collection are written together with the
/// toggle. Returns the updated record.
pub fn toggle_reviewed(
    session: &mut EditSession,
    collection: &str,
    source: &Path,
    position: usize,
    reviewed_root: &Path,
) -> Result<Record> {
    let disk = read_jsonl(source)?;
    let disk_record = disk.get(position).ok_or_else(|| {
        Error::NotFound(format!("Entry {} not found in {}", position, collection))
    })?;

    let mut record = session
        .get_effective(collection, position)
        .unwrap_or(disk_record)
        .clone();
    let old = record.reviewed();
    record.insert("reviewed", Value::Bool(!old));
    session.record_change(
        collection,
        position,
        "reviewed",
        Value::Bool(old),
        Value::Bool(!old),
        record.clone(),
    );

    let merged = merge_with_disk(session, collection, disk);
    write_working_copy(reviewed_root, collection, &merged)?;
    session.mark_saved(collection);

    Ok(record)
}

/// Write every buffered edit of `collection` to its working copy.
///
/// Disk content is read fresh from `source`. With nothing buffered this is
/// a no-op.
pub fn save_all(
    session: &mut EditSession,
    collection: &str,
    source: &Path,
    reviewed_root: &Path,
) -> Result<SaveOutcome> {
    if !session.has_unsaved(Some(collection)) {
        return Ok(SaveOutcome::NoChanges);
    }

    let disk = read_jsonl(source)?;
    let merged = merge_with_disk(session, collection, disk);
    let path = write_working_copy(reviewed_root, collection, &merged)?;
    session.mark_saved(collection);

    Ok(SaveOutcome::Saved { path })
}
