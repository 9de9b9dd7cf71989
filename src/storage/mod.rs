//! Storage layer for JSONL collections.
//!
//! A collection is one `.jsonl` file holding one record per line. This module
//! handles reading and writing whole collections, single-entry in-place
//! updates, timestamped backups, and the two persisted views of a collection:
//!
//! - **Working copy**: full-fidelity records written under the reviewed root,
//!   used for session continuity across restarts
//! - **Clean export**: redacted records (no evidence, hints, or nulls), see
//!   [`cleaner`]
//!
//! All whole-file writes go through [`write_jsonl_atomic`]: content is
//! serialized to a temporary file in the target directory and renamed into
//! place, so a failed write never leaves a half-written collection behind.

pub mod audit;
pub mod cleaner;
pub mod indexer;

pub use cleaner::{clean_entries, clean_entry};
pub use indexer::{
    CollectionInfo, Overview, file_id_for, get_file_by_id, index_directory, overview,
    relative_path_for,
};

use crate::models::Record;
use crate::{Error, Result};
use chrono::{Local, TimeZone, Timelike};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Open a collection file, mapping a missing file to [`Error::NotFound`].
fn open_collection(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(format!("{} does not exist", path.display())),
        _ => Error::Io(e),
    })
}

fn parse_line(path: &Path, line_num: usize, line: &str) -> Result<Record> {
    serde_json::from_str(line).map_err(|e| Error::Malformed {
        path: path.to_path_buf(),
        line: line_num,
        message: e.to_string(),
    })
}

/// Read all records from a JSONL file.
///
/// Blank lines are skipped. A line that is not a JSON object fails with
/// [`Error::Malformed`] naming its 1-based line number.
pub fn read_jsonl(path: &Path) -> Result<Vec<Record>> {
    read_jsonl_lazy(path)?.collect()
}

/// Lazily read records from a JSONL file.
pub fn read_jsonl_lazy(path: &Path) -> Result<JsonlRecords> {
    let file = open_collection(path)?;
    Ok(JsonlRecords {
        path: path.to_path_buf(),
        lines: BufReader::new(file).lines(),
        line_num: 0,
    })
}

/// Iterator over the records of a JSONL file.
pub struct JsonlRecords {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_num: usize,
}

impl Iterator for JsonlRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::Io(e))),
            };
            self.line_num += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(parse_line(&self.path, self.line_num, trimmed));
        }
    }
}

/// Read a single record by its zero-based position.
///
/// Only the target line is parsed. Returns `None` when the position is past
/// the end of the collection.
pub fn read_entry_by_index(path: &Path, index: usize) -> Result<Option<Record>> {
    let reader = BufReader::new(open_collection(path)?);
    let mut current = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if current == index {
            return parse_line(path, i + 1, trimmed).map(Some);
        }
        current += 1;
    }
    Ok(None)
}

/// Count the records in a JSONL file without parsing them.
pub fn count_entries(path: &Path) -> Result<usize> {
    let reader = BufReader::new(open_collection(path)?);
    let mut count = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Write items to a JSONL file atomically.
///
/// Parent directories are created as needed. The existing file (if any)
/// keeps its previous content unless the whole new content was written and
/// synced; the temporary file is removed on failure.
pub fn write_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    write_atomic(path, items).map_err(|source| Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic<T: Serialize>(path: &Path, items: &[T]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".gold-editor-")
        .suffix(".jsonl.tmp")
        .tempfile_in(parent)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        for item in items {
            serde_json::to_writer(&mut writer, item)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }

    // Keep the mode of the file being replaced.
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a timestamped backup next to the file.
///
/// `data/chat.jsonl` is copied to `data/chat.20260118_093000.bak`.
pub fn create_backup(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(Error::NotFound(format!(
            "Cannot backup: {} does not exist",
            path.display()
        )));
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = path.with_extension(format!("{}.bak", timestamp));
    fs::copy(path, &backup_path)?;
    info!(source = %path.display(), backup = %backup_path.display(), "created backup");
    Ok(backup_path)
}

/// Replace a single record in place.
///
/// Fails with [`Error::OutOfRange`] when `index` is past the end. When
/// `backup` is set a timestamped copy is made before overwriting, and its
/// path is returned. When `audit_log` is given the field-level changes are
/// appended to it.
pub fn update_entry(
    path: &Path,
    index: usize,
    record: Record,
    backup: bool,
    audit_log: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let mut records = read_jsonl(path)?;
    if index >= records.len() {
        return Err(Error::OutOfRange {
            index,
            len: records.len(),
        });
    }

    let backup_path = if backup {
        Some(create_backup(path)?)
    } else {
        None
    };

    let old = std::mem::replace(&mut records[index], record);
    write_jsonl_atomic(path, &records)?;

    if let Some(log_path) = audit_log {
        if let Err(e) = audit::log_edit(log_path, path, index, &old, &records[index]) {
            warn!(log = %log_path.display(), error = %e, "failed to write edit audit log");
        }
    }

    Ok(backup_path)
}

/// Location of a collection's working copy under the reviewed root.
pub fn working_copy_path(reviewed_root: &Path, relative_path: &str) -> PathBuf {
    reviewed_root.join(relative_path)
}

/// Persist full records (no redaction) as the collection's working copy.
pub fn write_working_copy(
    reviewed_root: &Path,
    relative_path: &str,
    records: &[Record],
) -> Result<PathBuf> {
    let path = working_copy_path(reviewed_root, relative_path);
    write_jsonl_atomic(&path, records)?;
    info!(path = %path.display(), entries = records.len(), "saved working copy");
    Ok(path)
}

/// Write the clean export view of a collection under `export_root`.
pub fn write_reviewed_file(
    export_root: &Path,
    relative_path: &str,
    records: &[Record],
) -> Result<PathBuf> {
    let path = export_root.join(relative_path);
    let cleaned = clean_entries(records);
    write_jsonl_atomic(&path, &cleaned)?;
    info!(path = %path.display(), entries = cleaned.len(), "wrote clean export");
    Ok(path)
}

/// Whether the first record's main message was sent outside working hours.
///
/// Working hours are 08:00 (inclusive) to 21:00 (exclusive), local time.
/// Returns false when the timestamp cannot be determined.
pub fn first_message_off_hours(path: &Path) -> bool {
    let Ok(Some(first)) = read_entry_by_index(path, 0) else {
        return false;
    };
    let Some(ts_ms) = first.message().and_then(|message| message.ts_ms()) else {
        return false;
    };
    match Local.timestamp_millis_opt(ts_ms).single() {
        Some(dt) => dt.hour() < 8 || dt.hour() >= 21,
        None => false,
    }
}
