//! Command implementations for the Gold Editor CLI.
//!
//! Each command returns a result type implementing [`Output`], which the
//! binary prints as JSON (default) or human-readable text (`-H`).

use crate::config::{Resolved, ResolvedSettings, Settings};
use crate::models::Record;
use crate::report::{ExportReport, build_report};
use crate::storage::{self, CollectionInfo};
use crate::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Find a collection by id: working copy first, then skipped, then primary.
pub fn find_collection(settings: &Settings, file_id: &str) -> Result<CollectionInfo> {
    let reviewed_root = settings.reviewed_root();
    let skipped_root = settings.skipped_root();
    storage::get_file_by_id(
        &settings.data_root,
        file_id,
        Some(&reviewed_root),
        Some(&skipped_root),
    )?
    .ok_or_else(|| Error::NotFound(format!("File {} not found", file_id)))
}

/// One collection in a listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub id: String,
    pub path: String,
    pub entry_count: usize,
    pub last_modified: DateTime<Local>,
    pub size_bytes: u64,
    /// First message sent outside 08:00-21:00
    pub off_hours: bool,
}

impl From<&CollectionInfo> for FileSummary {
    fn from(info: &CollectionInfo) -> Self {
        Self {
            id: info.file_id(),
            path: info.relative_path.clone(),
            entry_count: info.entry_count,
            last_modified: info.last_modified,
            size_bytes: info.size_bytes,
            off_hours: storage::first_message_off_hours(&info.path),
        }
    }
}

/// Collections under the data root.
#[derive(Debug, Clone, Serialize)]
pub struct FileList {
    pub files: Vec<FileSummary>,
    pub total_files: usize,
    pub total_entries: usize,
}

impl Output for FileList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.files.is_empty() {
            return "No collections found.".to_string();
        }
        let mut out = format!(
            "{} collection(s), {} entries:\n",
            self.total_files, self.total_entries
        );
        for file in &self.files {
            let marker = if file.off_hours { " [off-hours]" } else { "" };
            let _ = writeln!(
                out,
                "  {}  {} entries  ({}){}",
                file.path, file.entry_count, file.id, marker
            );
        }
        out.trim_end().to_string()
    }
}

/// List collections under the data root.
pub fn files(settings: &Settings) -> Result<FileList> {
    let collections = storage::index_directory(&settings.data_root)?;
    let files: Vec<FileSummary> = collections.iter().map(FileSummary::from).collect();
    Ok(FileList {
        total_files: files.len(),
        total_entries: files.iter().map(|f| f.entry_count).sum(),
        files,
    })
}

impl Output for ExportReport {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "{} file(s), {} entries, {} reviewed\n\nSlot                      non-null  true  false\n",
            self.total_files, self.total_entries, self.total_reviewed
        );
        for (slot, stats) in &self.global_slot_stats {
            let _ = writeln!(
                out,
                "{:<24} {:>9} {:>5} {:>6}",
                slot, stats.total_non_null, stats.true_count, stats.false_count
            );
        }
        out.trim_end().to_string()
    }
}

/// Build the slot statistics report.
pub fn report(settings: &Settings) -> Result<ExportReport> {
    build_report(&settings.data_root)
}

/// Result of writing a clean export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub file_id: String,
    pub path: PathBuf,
    pub entries: usize,
}

impl Output for ExportResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Exported {} entries of {} to {}",
            self.entries,
            self.file_id,
            self.path.display()
        )
    }
}

/// Write the clean view of a collection under `out`, or under an `export`
/// directory next to the data root.
pub fn export(settings: &Settings, file_id: &str, out: Option<PathBuf>) -> Result<ExportResult> {
    let info = find_collection(settings, file_id)?;
    let records = storage::read_jsonl(&info.path)?;
    let export_root = out.unwrap_or_else(|| export_root(settings));
    let path = storage::write_reviewed_file(&export_root, &info.relative_path, &records)?;
    Ok(ExportResult {
        file_id: file_id.to_string(),
        path,
        entries: records.len(),
    })
}

fn export_root(settings: &Settings) -> PathBuf {
    let root = std::path::absolute(&settings.data_root).unwrap_or_else(|_| settings.data_root.clone());
    match root.parent() {
        Some(parent) => parent.join("export"),
        None => root.join("export"),
    }
}

/// Result of a backup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub file_id: String,
    pub backup_path: PathBuf,
}

impl Output for BackupResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Backed up {} to {}", self.file_id, self.backup_path.display())
    }
}

/// Create a timestamped backup of a collection.
pub fn backup(settings: &Settings, file_id: &str) -> Result<BackupResult> {
    let info = find_collection(settings, file_id)?;
    Ok(BackupResult {
        file_id: file_id.to_string(),
        backup_path: storage::create_backup(&info.path)?,
    })
}

/// Result of an in-place replace.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaceResult {
    pub file_id: String,
    pub index: usize,
    pub backup_path: Option<PathBuf>,
}

impl Output for ReplaceResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.backup_path {
            Some(path) => format!(
                "Replaced entry {} of {} (backup: {})",
                self.index,
                self.file_id,
                path.display()
            ),
            None => format!("Replaced entry {} of {}", self.index, self.file_id),
        }
    }
}

/// Replace one record of a collection in place.
pub fn replace(settings: &Settings, file_id: &str, index: usize, json: &str) -> Result<ReplaceResult> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| Error::InvalidInput(format!("record is not valid JSON: {}", e)))?;
    let record = Record::from_value(value)?;
    let info = find_collection(settings, file_id)?;

    let backup_path = storage::update_entry(
        &info.path,
        index,
        record,
        settings.backup_on_save,
        settings.edits_log.as_deref(),
    )?;

    Ok(ReplaceResult {
        file_id: file_id.to_string(),
        index,
        backup_path,
    })
}

/// One setting and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct SettingValue {
    pub key: &'static str,
    pub value: serde_json::Value,
    pub source: String,
}

/// Resolved settings, for `gold-editor config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigShow {
    pub config_file: Option<PathBuf>,
    pub settings: Vec<SettingValue>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = match &self.config_file {
            Some(path) => format!("Config file: {}\n", path.display()),
            None => "Config file: (none)\n".to_string(),
        };
        for setting in &self.settings {
            let value = match &setting.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = writeln!(out, "  {:<20} {:<30} [{}]", setting.key, value, setting.source);
        }
        out.trim_end().to_string()
    }
}

fn setting<T: Serialize>(key: &'static str, resolved: &Resolved<T>) -> SettingValue {
    SettingValue {
        key,
        value: serde_json::to_value(&resolved.value).unwrap_or(serde_json::Value::Null),
        source: resolved.source.to_string(),
    }
}

fn optional_setting<T: Serialize>(key: &'static str, resolved: &Option<Resolved<T>>) -> SettingValue {
    match resolved {
        Some(resolved) => setting(key, resolved),
        None => SettingValue {
            key,
            value: serde_json::Value::Null,
            source: "default".to_string(),
        },
    }
}

/// Describe the resolved settings.
pub fn config_show(resolved: &ResolvedSettings) -> ConfigShow {
    ConfigShow {
        config_file: resolved.config_file.clone(),
        settings: vec![
            setting("data_root", &resolved.data_root),
            setting("host", &resolved.host),
            setting("port", &resolved.port),
            setting("backup_on_save", &resolved.backup_on_save),
            optional_setting("edits_log", &resolved.edits_log),
            optional_setting("reviewed_output_dir", &resolved.reviewed_output_dir),
            optional_setting("skipped_output_dir", &resolved.skipped_output_dir),
            setting("log_level", &resolved.log_level),
            setting("log_format", &resolved.log_format),
        ],
    }
}
