//! Collection discovery and file-id resolution.
//!
//! Collections are addressed over HTTP by a URL-safe file id: the path
//! relative to its root with every `/` replaced by `__`
//! (`clinic/kyiv.jsonl` becomes `clinic__kyiv.jsonl`).

use super::count_entries;
use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Separator token replacing `/` in file ids.
const ID_SEPARATOR: &str = "__";

/// Information about one collection file.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    /// Absolute path of the file that should be read
    pub path: PathBuf,
    /// Path relative to its root, `/`-separated
    pub relative_path: String,
    /// Number of records (0 if the file could not be counted)
    pub entry_count: usize,
    /// Last modification time
    pub last_modified: DateTime<Local>,
    /// File size in bytes
    pub size_bytes: u64,
}

impl CollectionInfo {
    fn from_path(path: PathBuf, relative_path: String) -> Result<Self> {
        let meta = fs::metadata(&path)?;
        let entry_count = count_entries(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "could not count entries");
            0
        });
        let last_modified = meta
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        Ok(Self {
            path,
            relative_path,
            entry_count,
            last_modified,
            size_bytes: meta.len(),
        })
    }

    /// The URL-safe id of this collection.
    pub fn file_id(&self) -> String {
        file_id_for(&self.relative_path)
    }
}

/// Convert a relative path to a file id.
pub fn file_id_for(relative_path: &str) -> String {
    relative_path.replace('/', ID_SEPARATOR)
}

/// Convert a file id back to a relative path.
pub fn relative_path_for(file_id: &str) -> String {
    file_id.replace(ID_SEPARATOR, "/")
}

/// Recursively discover all `.jsonl` files under `root`, sorted by relative path.
///
/// A missing root yields an empty list.
pub fn index_directory(root: &Path) -> Result<Vec<CollectionInfo>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let root = root.canonicalize()?;

    let mut paths = Vec::new();
    collect_jsonl(&root, &mut paths)?;

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let relative = relative_string(&root, &path);
        files.push(CollectionInfo::from_path(path, relative)?);
    }
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn collect_jsonl(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_jsonl(&path, out)?;
        } else if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_string(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `relative_path` under `root`, refusing anything that escapes it.
fn resolve_under(root: &Path, relative_path: &str) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let candidate = root.join(relative_path);
    if !candidate.is_file() {
        return None;
    }
    let resolved = candidate.canonicalize().ok()?;
    if !resolved.starts_with(&root) {
        warn!(requested = relative_path, "rejected path outside of root");
        return None;
    }
    Some(resolved)
}

/// Look up a collection by file id.
///
/// The reviewed root is checked first (a working copy takes precedence),
/// then the skipped root, then the primary data root. Returns `None` when the
/// file is absent or would resolve outside the root being checked.
pub fn get_file_by_id(
    root: &Path,
    file_id: &str,
    reviewed_root: Option<&Path>,
    skipped_root: Option<&Path>,
) -> Result<Option<CollectionInfo>> {
    let relative_path = relative_path_for(file_id);

    let roots = reviewed_root
        .into_iter()
        .chain(skipped_root)
        .chain(std::iter::once(root));

    for candidate_root in roots {
        if let Some(path) = resolve_under(candidate_root, &relative_path) {
            return CollectionInfo::from_path(path, relative_path).map(Some);
        }
    }
    Ok(None)
}

/// Collections grouped by review state.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// Primary collections with no reviewed or skipped counterpart
    pub pending: Vec<CollectionInfo>,
    pub reviewed: Vec<CollectionInfo>,
    pub skipped: Vec<CollectionInfo>,
}

/// Group the collections of the data root, reviewed root and skipped root.
pub fn overview(data_root: &Path, reviewed_root: &Path, skipped_root: &Path) -> Result<Overview> {
    let reviewed = index_directory(reviewed_root)?;
    let skipped = index_directory(skipped_root)?;

    let done: HashSet<&str> = reviewed
        .iter()
        .chain(&skipped)
        .map(|info| info.relative_path.as_str())
        .collect();
    let pending = index_directory(data_root)?
        .into_iter()
        .filter(|info| !done.contains(info.relative_path.as_str()))
        .collect();

    Ok(Overview {
        pending,
        reviewed,
        skipped,
    })
}
