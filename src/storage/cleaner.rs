//! Clean export view of records.
//!
//! The clean view drops annotator-only data before records leave the
//! editor: the `qa_hint` field, the whole `gold.evidence` section, and every
//! null value at any depth (object keys and array elements alike).
//! Working copies never go through here; they keep full fidelity.

use crate::models::Record;
use serde_json::{Map, Value};

/// Clean a single record. The input is left untouched.
pub fn clean_entry(record: &Record) -> Record {
    let mut cleaned = record.clone();
    cleaned.remove("qa_hint");
    if let Some(Value::Object(gold)) = cleaned.fields_mut().get_mut("gold") {
        gold.shift_remove("evidence");
    }
    strip_nulls(cleaned.fields_mut());
    cleaned
}

/// Clean a batch of records.
pub fn clean_entries(records: &[Record]) -> Vec<Record> {
    records.iter().map(clean_entry).collect()
}

fn strip_nulls(map: &mut Map<String, Value>) {
    map.retain(|_, value| !value.is_null());
    for value in map.values_mut() {
        remove_nulls(value);
    }
}

fn remove_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => strip_nulls(map),
        Value::Array(items) => {
            items.retain(|item| !item.is_null());
            for item in items.iter_mut() {
                remove_nulls(item);
            }
        }
        _ => {}
    }
}
