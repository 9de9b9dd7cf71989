//! Gold Editor - review and edit gold conversational-annotation datasets.
//!
//! This library provides the core functionality for the `gold-editor` CLI and
//! its local web server: JSONL record storage, the in-memory edit session,
//! role propagation across records that share a message, and the clean export
//! view used for external delivery.

pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod query;
pub mod report;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod storage;

use std::path::PathBuf;


/// Library-level error type for Gold Editor operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid JSON on line {line} of {}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Entry index {index} out of range (collection has {len} entries)")]
    OutOfRange { index: usize, len: usize },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Gold Editor operations.
pub type Result<T> = std::result::Result<T, Error>;
