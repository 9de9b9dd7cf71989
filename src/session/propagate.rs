//! Role propagation across records sharing a physical message.
//!
//! Records of a conversation overlap: the main message of one record shows
//! up again in the `context` of later records. Both copies carry the same
//! `ts_ms`, which acts as the message identity. When a role is changed on
//! one copy, every other copy in the same collection gets the same role.
//!
//! Two distinct messages sent within the same millisecond are
//! indistinguishable and will be treated as one.

use super::EditSession;
use crate::models::{MessageRef, Record};
use serde_json::Value;
use tracing::debug;

/// Apply `new_role` to every message with `ts_ms` in records other than
/// `source_position`, recording the changes in `session`.
///
/// Candidates are read from the session override when one exists, otherwise
/// from a copy of `disk`. Opaque messages and messages without a timestamp
/// never match. Returns the number of other records actually modified.
pub fn propagate_role_change(
    session: &mut EditSession,
    collection: &str,
    disk: &[Record],
    source_position: usize,
    ts_ms: i64,
    new_role: &str,
) -> usize {
    let mut synced = 0;

    for (position, disk_record) in disk.iter().enumerate() {
        if position == source_position {
            continue;
        }

        let mut candidate = session
            .get_effective(collection, position)
            .unwrap_or(disk_record)
            .clone();

        let changes = sync_record(&mut candidate, ts_ms, new_role);
        if changes.is_empty() {
            continue;
        }

        for (field_path, old_role) in changes {
            session.record_change(
                collection,
                position,
                &field_path,
                old_role,
                Value::String(new_role.to_string()),
                candidate.clone(),
            );
        }
        synced += 1;
    }

    if synced > 0 {
        debug!(collection, ts_ms, role = new_role, synced, "propagated role change");
    }
    synced
}

/// Set `role` on every matching message of one record.
///
/// Returns `(field_path, old_role)` for each message that changed.
fn sync_record(record: &mut Record, ts_ms: i64, role: &str) -> Vec<(String, Value)> {
    let mut changes = Vec::new();

    if let Some(message) = record.message() {
        if needs_sync(message, ts_ms, role) {
            let old = record.set_message_role(role);
            changes.push(("message.role".to_string(), old));
        }
    }

    let matching: Vec<usize> = record
        .context()
        .iter()
        .enumerate()
        .filter(|(_, entry)| needs_sync(MessageRef::new(entry), ts_ms, role))
        .map(|(i, _)| i)
        .collect();

    for i in matching {
        if let Some(old) = record.set_context_role(i, role) {
            changes.push((format!("context[{}].role", i), old));
        }
    }

    changes
}

fn needs_sync(message: MessageRef<'_>, ts_ms: i64, role: &str) -> bool {
    matches!(message, MessageRef::Structured(_))
        && message.ts_ms() == Some(ts_ms)
        && message.role() != Some(role)
}
