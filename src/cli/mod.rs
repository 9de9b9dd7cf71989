//! CLI argument definitions for Gold Editor.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gold Editor - review and edit gold conversational-annotation datasets.
///
/// Start with `gold-editor files` to see the collections under the data
/// root, then `gold-editor serve` to open the editor.
#[derive(Parser, Debug)]
#[command(name = "gold-editor")]
#[command(author, version, about = "Review and edit gold annotation datasets stored as JSONL", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// KDL config file (default: ./gold-editor.kdl, then ~/.config/gold-editor/config.kdl)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Root directory containing the JSONL collections.
    /// Can also be set via GOLD_EDITOR_DATA_ROOT or `data-root` in the config file.
    #[arg(long = "data-root", global = true)]
    pub data_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the editor web server
    #[cfg(feature = "server")]
    Serve {
        /// Host address to bind to (default: 127.0.0.1, use 0.0.0.0 for network access)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default: 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List collections under the data root
    Files,

    /// Slot statistics across all collections
    Report,

    /// Write the clean export view of a collection
    Export {
        /// Collection id (relative path with `/` replaced by `__`)
        file_id: String,

        /// Output directory (default: an `export` directory next to the data root)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Create a timestamped backup of a collection
    Backup {
        /// Collection id
        file_id: String,
    },

    /// Replace one record in place
    ///
    /// Takes a backup first unless `backup-on-save` is disabled, and appends
    /// the changed fields to the edits log when one is configured.
    Replace {
        /// Collection id
        file_id: String,

        /// Zero-based record position
        index: usize,

        /// The new record as a JSON object
        record: String,
    },

    /// Show resolved settings and where each value came from
    Config,
}
