//! Edit audit log for in-place record updates.
//!
//! Each in-place update appends one JSON line describing which fields of the
//! record changed, keyed by dotted field path:
//!
//! ```text
//! {"timestamp":"2026-01-31T12:00:00Z","file":"data/chat.jsonl","index":0,"entry_id":"chat.json:0","changes":{"gold.slots.name":{"old":null,"new":"John"}}}
//! ```

use crate::Result;
use crate::models::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// A single audit log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditLogEntry {
    /// When the edit was written
    pub timestamp: DateTime<Utc>,

    /// Collection file that was edited
    pub file: String,

    /// Position of the edited record
    pub index: usize,

    /// Record identifier (`"unknown"` when the record has none)
    pub entry_id: String,

    /// Changed field paths mapped to `{"old": ..., "new": ...}`
    pub changes: Map<String, Value>,
}

/// Append an entry describing the edit of `old` into `new` to the log.
pub fn log_edit(
    log_path: &Path,
    file_path: &Path,
    index: usize,
    old: &Record,
    new: &Record,
) -> Result<()> {
    let entry_id = match new.id() {
        "" => "unknown".to_string(),
        id => id.to_string(),
    };

    let entry = EditLogEntry {
        timestamp: Utc::now(),
        file: file_path.to_string_lossy().to_string(),
        index,
        entry_id,
        changes: compute_changes(
            &Value::Object(old.fields().clone()),
            &Value::Object(new.fields().clone()),
        ),
    };

    write_log_entry(log_path, &entry)
}

fn write_log_entry(path: &Path, entry: &EditLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Compute the differences between two JSON values.
///
/// Objects are compared key by key (a missing key counts as null); any other
/// differing pair is reported at its dotted path.
pub fn compute_changes(old: &Value, new: &Value) -> Map<String, Value> {
    let mut changes = Map::new();
    compare("", old, new, &mut changes);
    changes
}

fn compare(path: &str, old: &Value, new: &Value, changes: &mut Map<String, Value>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys = a.keys().chain(b.keys().filter(|k| !a.contains_key(*k)));
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                compare(
                    &child,
                    a.get(key).unwrap_or(&Value::Null),
                    b.get(key).unwrap_or(&Value::Null),
                    changes,
                );
            }
        }
        _ if old != new => {
            changes.insert(
                path.to_string(),
                serde_json::json!({"old": old, "new": new}),
            );
        }
        _ => {}
    }
}
