//! Data models for gold dataset records.
//!
//! This module defines the core data structures:
//! - `Record` - One annotated conversational turn, kept as an ordered JSON
//!   object so unknown fields survive every transformation
//! - `MessageRef` - A borrowed view of a message-shaped value (main message
//!   or a context entry), either structured or opaque legacy data
//! - `EntryUpdate` - A partial update description applied by the edit session

pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A single annotated record.
///
/// Records are stored as an ordered key-value tree. Known fields (`id`,
/// `message`, `context`, `gold`, `qa_hint`, `reviewed`) are reached through
/// typed accessors; everything else passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidInput(format!(
                "record must be a JSON object, got: {}",
                other
            ))),
        }
    }

    /// Convert back into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Borrow the underlying object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying object.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Stable identifier, or `""` when absent.
    pub fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or("")
    }

    /// The main message, if present.
    pub fn message(&self) -> Option<MessageRef<'_>> {
        self.0.get("message").map(MessageRef::new)
    }

    /// Set the main message's role, returning the previous role value.
    ///
    /// A missing or non-object message is replaced by a minimal structured
    /// message without a timestamp, so it never joins with other records.
    pub fn set_message_role(&mut self, role: &str) -> Value {
        match self.0.get_mut("message") {
            Some(Value::Object(message)) => message
                .insert("role".to_string(), Value::String(role.to_string()))
                .unwrap_or(Value::Null),
            _ => {
                self.0.insert(
                    "message".to_string(),
                    serde_json::json!({"role": role, "text": "", "ts_ms": null}),
                );
                Value::Null
            }
        }
    }

    /// Context messages preceding the main message (empty when absent).
    pub fn context(&self) -> &[Value] {
        self.0
            .get("context")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Set the role of `context[index]`, returning the previous role value.
    ///
    /// Returns `None` (and changes nothing) when the index is out of bounds
    /// or the context entry is not an object.
    pub fn set_context_role(&mut self, index: usize, role: &str) -> Option<Value> {
        let entry = self
            .0
            .get_mut("context")
            .and_then(Value::as_array_mut)
            .and_then(|context| context.get_mut(index))
            .and_then(Value::as_object_mut)?;
        Some(
            entry
                .insert("role".to_string(), Value::String(role.to_string()))
                .unwrap_or(Value::Null),
        )
    }

    /// The `gold` object, if present.
    pub fn gold(&self) -> Option<&Map<String, Value>> {
        self.0.get("gold").and_then(Value::as_object)
    }

    /// The `gold` object, created on first write.
    pub fn gold_mut(&mut self) -> &mut Map<String, Value> {
        ensure_object(&mut self.0, "gold")
    }

    /// Slot values (`gold.slots`), if present.
    pub fn slots(&self) -> Option<&Map<String, Value>> {
        self.gold()
            .and_then(|gold| gold.get("slots"))
            .and_then(Value::as_object)
    }

    /// Slot values, with `gold` and `gold.slots` created on first write.
    pub fn slots_mut(&mut self) -> &mut Map<String, Value> {
        ensure_object(self.gold_mut(), "slots")
    }

    /// A single slot's value, treating absent and null alike.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots()
            .and_then(|slots| slots.get(name))
            .filter(|value| !value.is_null())
    }

    /// Evidence values, with `gold` and `gold.evidence` created on first write.
    pub fn evidence_mut(&mut self) -> &mut Map<String, Value> {
        ensure_object(self.gold_mut(), "evidence")
    }

    /// The QA hint, if set and a string.
    pub fn qa_hint(&self) -> Option<&str> {
        self.0.get("qa_hint").and_then(Value::as_str)
    }

    /// Whether the record has been reviewed (default false).
    pub fn reviewed(&self) -> bool {
        self.0
            .get("reviewed")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Look up an arbitrary top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set an arbitrary top-level field, returning the previous value.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.0.insert(key.to_string(), value)
    }

    /// Remove a top-level field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }
}

/// Get `map[key]` as an object, replacing absent or non-object values.
fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

/// A borrowed view of a message-shaped value.
///
/// Structured messages are JSON objects carrying `role`, `text` and a
/// millisecond `ts_ms`. Anything else is legacy data that is displayed and
/// searched but never takes part in role propagation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageRef<'a> {
    Structured(&'a Map<String, Value>),
    Opaque(&'a Value),
}

impl<'a> MessageRef<'a> {
    /// Classify a message-shaped value.
    pub fn new(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => MessageRef::Structured(map),
            other => MessageRef::Opaque(other),
        }
    }

    /// The timestamp join key; `None` for opaque messages and null/absent values.
    pub fn ts_ms(&self) -> Option<i64> {
        match self {
            MessageRef::Structured(map) => map.get("ts_ms").and_then(Value::as_i64),
            MessageRef::Opaque(_) => None,
        }
    }

    /// The role value as stored (null when absent or opaque).
    pub fn role_value(&self) -> Value {
        match self {
            MessageRef::Structured(map) => map.get("role").cloned().unwrap_or(Value::Null),
            MessageRef::Opaque(_) => Value::Null,
        }
    }

    /// The role, when it is a string.
    pub fn role(&self) -> Option<&'a str> {
        match self {
            MessageRef::Structured(map) => map.get("role").and_then(Value::as_str),
            MessageRef::Opaque(_) => None,
        }
    }

    /// Text used for display and search.
    ///
    /// Opaque messages are rendered as their raw JSON.
    pub fn searchable_text(&self) -> String {
        match self {
            MessageRef::Structured(map) => map
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            MessageRef::Opaque(Value::String(s)) => s.clone(),
            MessageRef::Opaque(other) => other.to_string(),
        }
    }
}

/// Partial update for one record. Every axis is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    /// Slot values merged into `gold.slots`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Map<String, Value>>,

    /// Evidence values merged into `gold.evidence`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Map<String, Value>>,

    /// Intention tags (replaces `gold.intentions`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intentions: Option<Vec<String>>,

    /// QA hint (replaces `qa_hint`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_hint: Option<String>,

    /// Reviewed flag (replaces `reviewed`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed: Option<bool>,

    /// New role for the main message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_role: Option<String>,

    /// Role updates for individual context messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_updates: Option<Vec<ContextRoleUpdate>>,
}

/// Role update for `context[index]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRoleUpdate {
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}
