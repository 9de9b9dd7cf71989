//! Read-only statistics over collections.

use crate::Result;
use crate::models::Record;
use crate::models::schema::{all_slots, is_bool_slot};
use crate::query::has_non_null_slot;
use crate::storage::{CollectionInfo, index_directory, read_jsonl};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Summary statistics for one collection.
#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub path: String,
    pub entry_count: usize,
    pub reviewed_count: usize,
    /// Records with at least one non-null slot
    pub non_null_slots_count: usize,
    pub last_modified: DateTime<Local>,
}

impl FileStats {
    pub fn new(info: &CollectionInfo, records: &[Record]) -> Self {
        Self {
            path: info.relative_path.clone(),
            entry_count: records.len(),
            reviewed_count: records.iter().filter(|r| r.reviewed()).count(),
            non_null_slots_count: records.iter().filter(|r| has_non_null_slot(r)).count(),
            last_modified: info.last_modified,
        }
    }
}

/// Value counts for one slot. True/false counts are only kept for boolean slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotStats {
    pub total_non_null: usize,
    pub true_count: usize,
    pub false_count: usize,
}

impl SlotStats {
    fn add(&mut self, slot: &str, value: &Value) {
        if value.is_null() {
            return;
        }
        self.total_non_null += 1;
        if is_bool_slot(slot) {
            match value {
                Value::Bool(true) => self.true_count += 1,
                Value::Bool(false) => self.false_count += 1,
                _ => {}
            }
        }
    }

    fn merge(&mut self, other: &SlotStats) {
        self.total_non_null += other.total_non_null;
        self.true_count += other.true_count;
        self.false_count += other.false_count;
    }
}

/// Per-slot counts for one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub path: String,
    pub total_entries: usize,
    pub reviewed_count: usize,
    pub slots: BTreeMap<String, SlotStats>,
}

impl CollectionReport {
    pub fn new(path: &str, records: &[Record]) -> Self {
        let mut slots: BTreeMap<String, SlotStats> = all_slots()
            .map(|slot| (slot.to_string(), SlotStats::default()))
            .collect();

        for record in records {
            for (slot, stats) in slots.iter_mut() {
                if let Some(value) = record.slot(slot) {
                    stats.add(slot, value);
                }
            }
        }

        Self {
            path: path.to_string(),
            total_entries: records.len(),
            reviewed_count: records.iter().filter(|r| r.reviewed()).count(),
            slots,
        }
    }
}

/// Aggregate statistics across every collection under a root.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub total_files: usize,
    pub total_entries: usize,
    pub total_reviewed: usize,
    pub files: Vec<CollectionReport>,
    pub global_slot_stats: BTreeMap<String, SlotStats>,
}

/// Build the statistics report for all collections under `root`.
///
/// Collections that fail to load are left out of the per-file list and the
/// totals, but still count towards `total_files`.
pub fn build_report(root: &Path) -> Result<ExportReport> {
    let collections = index_directory(root)?;

    let mut global_slot_stats: BTreeMap<String, SlotStats> = all_slots()
        .map(|slot| (slot.to_string(), SlotStats::default()))
        .collect();
    let mut files = Vec::with_capacity(collections.len());

    for info in &collections {
        let records = match read_jsonl(&info.path) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %info.path.display(), error = %e, "skipping collection in report");
                continue;
            }
        };
        let report = CollectionReport::new(&info.relative_path, &records);
        for (slot, stats) in &report.slots {
            global_slot_stats.entry(slot.clone()).or_default().merge(stats);
        }
        files.push(report);
    }

    Ok(ExportReport {
        total_files: collections.len(),
        total_entries: files.iter().map(|f| f.total_entries).sum(),
        total_reviewed: files.iter().map(|f| f.reviewed_count).sum(),
        files,
        global_slot_stats,
    })
}
