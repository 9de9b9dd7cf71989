//! Record listing: filters, free-text search, and pagination.
//!
//! Listings work on effective records (session overrides applied) and carry
//! each record's position explicitly, so duplicate records never get
//! confused with one another.

use crate::models::schema::{BOOL_SLOTS, TREATMENT};
use crate::models::{MessageRef, Record};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 500;

/// Key under which a listed record carries its position.
pub const ORIGINAL_INDEX_KEY: &str = "_original_index";

/// Listing predicates. All enabled predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EntryFilter {
    /// At least one slot is non-null
    pub filter_non_null: bool,
    /// The treatment slot is set
    pub filter_treatment: bool,
    /// At least one boolean slot is set
    pub filter_bool_slots: bool,
    /// A non-empty QA hint is present
    pub filter_qa_hint: bool,
    /// Case-insensitive substring of the searchable text
    pub search: String,
}

impl EntryFilter {
    /// A filter that only searches for `query`.
    pub fn search(query: &str) -> Self {
        Self {
            search: query.to_string(),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.filter_non_null && !has_non_null_slot(record) {
            return false;
        }
        if self.filter_treatment && record.slot(TREATMENT).is_none() {
            return false;
        }
        if self.filter_bool_slots && !BOOL_SLOTS.iter().any(|slot| record.slot(slot).is_some()) {
            return false;
        }
        if self.filter_qa_hint && record.qa_hint().is_none_or(str::is_empty) {
            return false;
        }
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            if !searchable_text(record).to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Whether any slot of the record holds a non-null value.
pub fn has_non_null_slot(record: &Record) -> bool {
    record
        .slots()
        .is_some_and(|slots| slots.values().any(|value| !value.is_null()))
}

/// Text searched by free-text queries: the main message, context texts,
/// non-null slot values and the QA hint, joined by spaces.
pub fn searchable_text(record: &Record) -> String {
    let mut parts = Vec::new();

    if let Some(message) = record.message() {
        parts.push(message.searchable_text());
    }

    for entry in record.context() {
        if let message @ MessageRef::Structured(_) = MessageRef::new(entry) {
            parts.push(message.searchable_text());
        }
    }

    if let Some(slots) = record.slots() {
        for value in slots.values() {
            match value {
                Value::Null => {}
                Value::String(s) => parts.push(s.clone()),
                other => parts.push(other.to_string()),
            }
        }
    }

    if let Some(hint) = record.qa_hint().filter(|hint| !hint.is_empty()) {
        parts.push(hint.to_string());
    }

    parts.join(" ")
}

/// Requested page, validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub page_size: usize,
}

impl Page {
    /// Validate a page request: `page >= 1` and `1 <= page_size <= 500`.
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page < 1 {
            return Err(Error::InvalidInput("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::InvalidInput(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, page_size })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize)]
pub struct EntryPage {
    pub entries: Vec<Record>,
    /// Number of records matching the filter (across all pages)
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Filter `records` and return the requested page.
///
/// Each returned record is tagged with its position in `records` under
/// [`ORIGINAL_INDEX_KEY`].
pub fn list_entries(records: &[Record], filter: &EntryFilter, page: Page) -> EntryPage {
    let matching: Vec<(usize, &Record)> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| filter.matches(record))
        .collect();

    let total = matching.len();
    let entries = matching
        .into_iter()
        .skip(page.page.saturating_sub(1).saturating_mul(page.page_size))
        .take(page.page_size)
        .map(|(position, record)| tagged(position, record))
        .collect();

    EntryPage {
        entries,
        total,
        page: page.page,
        page_size: page.page_size,
    }
}

/// Every record matching `query`, unpaginated.
pub fn search_entries(records: &[Record], query: &str) -> EntryPage {
    let filter = EntryFilter::search(query);
    let entries: Vec<Record> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| filter.matches(record))
        .map(|(position, record)| tagged(position, record))
        .collect();
    let total = entries.len();

    EntryPage {
        entries,
        total,
        page: 1,
        page_size: total,
    }
}

fn tagged(position: usize, record: &Record) -> Record {
    let mut record = record.clone();
    record.insert(ORIGINAL_INDEX_KEY, Value::from(position));
    record
}
