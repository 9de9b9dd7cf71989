//! Partial record updates.

use super::{EditSession, propagate_role_change};
use crate::models::schema::HAIR_REMOVAL_AREAS;
use crate::models::{EntryUpdate, MessageRef, Record};
use crate::{Error, Result};
use serde_json::Value;

/// Result of applying an [`EntryUpdate`].
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    /// Effective record after the update
    pub record: Record,
    /// Other records whose roles were synced by propagation
    pub synced_count: usize,
}

/// Apply `update` to the record at `position` of `collection`.
///
/// The record is taken from the session override if one exists, otherwise
/// copied from `disk`. Axes are applied in a fixed order (slots, evidence,
/// intentions, QA hint, reviewed, message role, context roles) and each
/// touched field is recorded in the session before the next one is
/// processed. Context updates with an out-of-bounds index, a missing role,
/// or a non-object target are skipped.
pub fn apply_patch(
    session: &mut EditSession,
    collection: &str,
    disk: &[Record],
    position: usize,
    update: &EntryUpdate,
) -> Result<PatchOutcome> {
    let disk_record = disk.get(position).ok_or_else(|| {
        Error::NotFound(format!("Entry {} not found in {}", position, collection))
    })?;
    let mut record = session
        .get_effective(collection, position)
        .unwrap_or(disk_record)
        .clone();

    if let Some(slots) = &update.slots {
        for (name, value) in slots {
            let value = normalize_slot(name, value.clone());
            let old = record
                .slots_mut()
                .insert(name.clone(), value.clone())
                .unwrap_or(Value::Null);
            let path = format!("gold.slots.{}", name);
            session.record_change(collection, position, &path, old, value, record.clone());
        }
    }

    if let Some(evidence) = &update.evidence {
        for (name, value) in evidence {
            let old = record
                .evidence_mut()
                .insert(name.clone(), value.clone())
                .unwrap_or(Value::Null);
            let path = format!("gold.evidence.{}", name);
            session.record_change(collection, position, &path, old, value.clone(), record.clone());
        }
    }

    if let Some(intentions) = &update.intentions {
        let value = Value::from(intentions.clone());
        let old = record
            .gold_mut()
            .insert("intentions".to_string(), value.clone())
            .unwrap_or(Value::Null);
        session.record_change(collection, position, "gold.intentions", old, value, record.clone());
    }

    if let Some(hint) = &update.qa_hint {
        let value = Value::String(hint.clone());
        let old = record.insert("qa_hint", value.clone()).unwrap_or(Value::Null);
        session.record_change(collection, position, "qa_hint", old, value, record.clone());
    }

    if let Some(reviewed) = update.reviewed {
        let old = Value::Bool(record.reviewed());
        record.insert("reviewed", Value::Bool(reviewed));
        session.record_change(
            collection,
            position,
            "reviewed",
            old,
            Value::Bool(reviewed),
            record.clone(),
        );
    }

    let mut synced_count = 0;

    if let Some(role) = &update.message_role {
        let old = record.set_message_role(role);
        session.record_change(
            collection,
            position,
            "message.role",
            old,
            Value::String(role.clone()),
            record.clone(),
        );
        if let Some(ts_ms) = record.message().and_then(|message| message.ts_ms()) {
            synced_count +=
                propagate_role_change(session, collection, disk, position, ts_ms, role);
        }
    }

    for context_update in update.context_updates.iter().flatten() {
        let (Some(index), Some(role)) = (context_update.index, context_update.role.as_deref())
        else {
            continue;
        };
        let Ok(index) = usize::try_from(index) else {
            continue;
        };
        if role.is_empty() {
            continue;
        }
        let Some(old) = record.set_context_role(index, role) else {
            continue;
        };
        session.record_change(
            collection,
            position,
            &format!("context[{}].role", index),
            old,
            Value::String(role.to_string()),
            record.clone(),
        );
        let ts_ms = record
            .context()
            .get(index)
            .and_then(|entry| MessageRef::new(entry).ts_ms());
        if let Some(ts_ms) = ts_ms {
            synced_count +=
                propagate_role_change(session, collection, disk, position, ts_ms, role);
        }
    }

    Ok(PatchOutcome {
        record,
        synced_count,
    })
}

/// Split the comma-separated area list into trimmed, non-empty parts.
fn normalize_slot(name: &str, value: Value) -> Value {
    match value {
        Value::String(s) if name == HAIR_REMOVAL_AREAS && !s.is_empty() => Value::from(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>(),
        ),
        other => other,
    }
}
