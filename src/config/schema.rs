//! KDL schema for `gold-editor.kdl` and the resolved `Settings`.
//!
//! # KDL Schema
//!
//! ```kdl
//! data-root "/srv/gold/output"
//! host "0.0.0.0"
//! port 8080
//! backup-on-save #false
//! edits-log "/srv/gold/edits.log"
//! reviewed-output-dir "/srv/gold/reviewed"
//! skipped-output-dir "/srv/gold/skipped"
//! log-level "debug"
//! log-format "json"
//! ```

use crate::{Error, Result};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default host the server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Values read from a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub data_root: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub backup_on_save: Option<bool>,
    pub edits_log: Option<PathBuf>,
    pub reviewed_output_dir: Option<PathBuf>,
    pub skipped_output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node: &KdlNode| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(str::to_string)
}

impl FileConfig {
    /// Parse config from a KDL document.
    ///
    /// Fails on values of the wrong type; unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        let mut config = Self {
            data_root: first_string(doc, "data-root").map(PathBuf::from),
            host: first_string(doc, "host"),
            edits_log: first_string(doc, "edits-log").map(PathBuf::from),
            reviewed_output_dir: first_string(doc, "reviewed-output-dir").map(PathBuf::from),
            skipped_output_dir: first_string(doc, "skipped-output-dir").map(PathBuf::from),
            log_level: first_string(doc, "log-level"),
            ..Default::default()
        };

        if let Some(node) = doc.get("port") {
            let port = node
                .entries()
                .first()
                .and_then(|entry| entry.value().as_integer())
                .and_then(|i| u16::try_from(i).ok())
                .ok_or_else(|| Error::Config("port must be an integer in 0-65535".to_string()))?;
            config.port = Some(port);
        }

        if let Some(node) = doc.get("backup-on-save") {
            let flag = node
                .entries()
                .first()
                .and_then(|entry| entry.value().as_bool())
                .ok_or_else(|| Error::Config("backup-on-save must be #true or #false".to_string()))?;
            config.backup_on_save = Some(flag);
        }

        if let Some(format) = first_string(doc, "log-format") {
            config.log_format = Some(LogFormat::parse(&format).ok_or_else(|| {
                Error::Config(format!("log-format must be \"text\" or \"json\", got {:?}", format))
            })?);
        }

        Ok(config)
    }

    /// Load and parse a KDL config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;
        Self::from_kdl(&doc)
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Root directory holding the primary collections
    pub data_root: PathBuf,
    pub host: String,
    pub port: u16,
    /// Take a timestamped backup before single-entry in-place updates
    pub backup_on_save: bool,
    /// Audit log for in-place updates, if enabled
    pub edits_log: Option<PathBuf>,
    pub reviewed_output_dir: Option<PathBuf>,
    pub skipped_output_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Settings {
    /// Settings with built-in defaults for everything but the data root.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backup_on_save: true,
            edits_log: None,
            reviewed_output_dir: None,
            skipped_output_dir: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Text,
        }
    }

    /// Where working copies live: the configured directory, or a `reviewed`
    /// sibling of the data root.
    pub fn reviewed_root(&self) -> PathBuf {
        self.reviewed_output_dir
            .clone()
            .unwrap_or_else(|| self.sibling("reviewed"))
    }

    /// Where skipped collections live: the configured directory, or a
    /// `skipped` sibling of the data root.
    pub fn skipped_root(&self) -> PathBuf {
        self.skipped_output_dir
            .clone()
            .unwrap_or_else(|| self.sibling("skipped"))
    }

    fn sibling(&self, name: &str) -> PathBuf {
        let root = std::path::absolute(&self.data_root).unwrap_or_else(|_| self.data_root.clone());
        match root.parent() {
            Some(parent) => parent.join(name),
            None => root.join(name),
        }
    }
}
