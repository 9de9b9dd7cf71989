//! Common test utilities for gold-editor integration tests.
//!
//! Provides `TestEnv`, an isolated data root with its reviewed and export
//! siblings, so tests never read the user's config or datasets.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Environment variables the resolver reads; cleared for every command.
const SETTING_VARS: &[&str] = &[
    "GOLD_EDITOR_DATA_ROOT",
    "GOLD_EDITOR_HOST",
    "GOLD_EDITOR_PORT",
    "GOLD_EDITOR_BACKUP_ON_SAVE",
    "GOLD_EDITOR_EDITS_LOG",
    "GOLD_EDITOR_REVIEWED_OUTPUT_DIR",
    "GOLD_EDITOR_SKIPPED_OUTPUT_DIR",
    "GOLD_EDITOR_LOG_LEVEL",
    "GOLD_EDITOR_LOG_FORMAT",
];

/// A temporary workspace laid out as `<tmp>/output` (data root) with
/// `<tmp>/reviewed` and `<tmp>/export` as siblings.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Create an environment with an empty data root.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("output")).unwrap();
        Self { dir }
    }

    /// Create an environment holding the three-record conversation at
    /// `clinic/chat.jsonl`.
    pub fn with_conversation() -> Self {
        let env = Self::new();
        env.write_collection("clinic/chat.jsonl", &conversation());
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_root(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    pub fn reviewed_root(&self) -> PathBuf {
        self.dir.path().join("reviewed")
    }

    /// Write records as JSONL under the data root.
    pub fn write_collection(&self, relative: &str, records: &[Value]) -> PathBuf {
        let path = self.data_root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body: String = records.iter().map(|r| format!("{}\n", r)).collect();
        fs::write(&path, body).unwrap();
        path
    }

    /// Read a JSONL file back as values.
    pub fn read_jsonl(&self, path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// A `gold-editor` command isolated from the user's config and env.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gold-editor"));
        cmd.current_dir(self.path());
        for var in SETTING_VARS {
            cmd.env_remove(var);
        }
        cmd.env_remove("RUST_LOG");
        cmd.env("HOME", self.path());
        cmd.env("XDG_CONFIG_HOME", self.path().join(".config"));
        cmd.env("GOLD_EDITOR_DATA_ROOT", self.data_root());
        cmd
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A record shaped like a real annotated turn.
pub fn record(id: &str, role: &str, text: &str, ts_ms: i64) -> Value {
    json!({
        "id": id,
        "source": {"drive_path": "thread.json", "thread_dir": "", "message_index": 0},
        "message": {"role": role, "text": text, "ts_ms": ts_ms},
        "context": [],
        "gold": {
            "slots": {"name": null, "treatment": null, "is_first_time": null},
            "evidence": {"name": null}
        },
        "qa_hint": null
    })
}

/// Three records where the first message reappears in the second's context.
pub fn conversation() -> Vec<Value> {
    let mut second = record("c:1", "client", "Second", 2000);
    second["context"] = json!([{"role": "client", "text": "First", "ts_ms": 1000}]);
    vec![
        record("c:0", "client", "First", 1000),
        second,
        record("c:2", "brand", "Other", 3000),
    ]
}
