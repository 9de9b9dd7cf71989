//! Integration tests for the gold-editor CLI.

mod common;

use common::{TestEnv, record};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;

#[test]
fn test_files_empty_data_root() {
    let env = TestEnv::new();
    let files = env.json(&["files"]);
    assert_eq!(files["total_files"], 0);
    assert_eq!(files["files"], json!([]));
}

#[test]
fn test_files_lists_nested_collections() {
    let env = TestEnv::with_conversation();
    env.write_collection("a.jsonl", &[record("a:0", "client", "Hi", 5000)]);

    let files = env.json(&["files"]);
    assert_eq!(files["total_files"], 2);
    assert_eq!(files["total_entries"], 4);

    let ids: Vec<&str> = files["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a.jsonl", "clinic__chat.jsonl"]);
}

#[test]
fn test_files_human_readable() {
    let env = TestEnv::with_conversation();
    env.cmd()
        .args(["files", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 collection(s), 3 entries"))
        .stdout(predicate::str::contains("clinic/chat.jsonl"));
}

#[test]
fn test_data_root_flag_overrides_env() {
    let env = TestEnv::with_conversation();
    let other = env.path().join("other");
    fs::create_dir_all(&other).unwrap();

    let files = env.json(&["files", "--data-root", other.to_str().unwrap()]);
    assert_eq!(files["total_files"], 0);
}

#[test]
fn test_report_counts_slots() {
    let env = TestEnv::new();
    let mut filled = record("r:0", "client", "Hi", 1000);
    filled["gold"]["slots"]["name"] = json!("Olena");
    filled["gold"]["slots"]["is_first_time"] = json!(true);
    filled["reviewed"] = json!(true);
    env.write_collection(
        "r.jsonl",
        &[filled, record("r:1", "brand", "Hello", 2000)],
    );

    let report = env.json(&["report"]);
    assert_eq!(report["total_files"], 1);
    assert_eq!(report["total_entries"], 2);
    assert_eq!(report["total_reviewed"], 1);
    assert_eq!(report["global_slot_stats"]["name"]["total_non_null"], 1);
    assert_eq!(report["global_slot_stats"]["is_first_time"]["true_count"], 1);
    assert_eq!(report["global_slot_stats"]["is_first_time"]["false_count"], 0);
}

#[test]
fn test_export_writes_clean_view() {
    let env = TestEnv::new();
    let mut first = record("e:0", "client", "Hi", 1000);
    first["qa_hint"] = json!("check name");
    first["gold"]["evidence"]["name"] = json!("Hi");
    env.write_collection("clinic/chat.jsonl", &[first]);

    let result = env.json(&["export", "clinic__chat.jsonl"]);
    assert_eq!(result["entries"], 1);

    let exported = env.path().join("export/clinic/chat.jsonl");
    assert!(exported.is_file());
    let records = env.read_jsonl(&exported);
    assert_eq!(records.len(), 1);
    assert!(records[0].get("qa_hint").is_none());
    assert!(records[0]["gold"].get("evidence").is_none());
    assert!(records[0]["gold"]["slots"].get("name").is_none());
    assert_eq!(records[0]["message"]["text"], "Hi");
}

#[test]
fn test_export_to_explicit_directory() {
    let env = TestEnv::with_conversation();
    let out = env.path().join("delivery");

    env.cmd()
        .args(["export", "clinic__chat.jsonl", "--out", out.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(env.read_jsonl(&out.join("clinic/chat.jsonl")).len(), 3);
}

#[test]
fn test_backup_copies_collection() {
    let env = TestEnv::with_conversation();
    let result = env.json(&["backup", "clinic__chat.jsonl"]);

    let backup = result["backup_path"].as_str().unwrap();
    assert!(backup.ends_with(".bak"));
    let original = fs::read_to_string(env.data_root().join("clinic/chat.jsonl")).unwrap();
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
}

#[test]
fn test_replace_updates_one_record() {
    let env = TestEnv::with_conversation();
    let path = env.data_root().join("clinic/chat.jsonl");
    let mut replacement = record("c:1", "brand", "Second", 2000);
    replacement["reviewed"] = json!(true);

    let result = env.json(&[
        "replace",
        "clinic__chat.jsonl",
        "1",
        &replacement.to_string(),
    ]);
    assert_eq!(result["index"], 1);
    assert!(result["backup_path"].is_string());

    let records = env.read_jsonl(&path);
    assert_eq!(records.len(), 3);
    assert_eq!(records[1], replacement);
    assert_eq!(records[0]["id"], "c:0");
    assert_eq!(records[2]["id"], "c:2");
}

#[test]
fn test_replace_rejects_invalid_json() {
    let env = TestEnv::with_conversation();
    env.cmd()
        .args(["replace", "clinic__chat.jsonl", "0", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_replace_past_end_fails() {
    let env = TestEnv::with_conversation();
    env.cmd()
        .args(["replace", "clinic__chat.jsonl", "9", "{\"id\":\"x\"}"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_unknown_file_reports_json_error() {
    let env = TestEnv::new();
    let output = env
        .cmd()
        .args(["backup", "missing.jsonl"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let last = stderr.lines().last().unwrap();
    let error: Value = serde_json::from_str(last).unwrap();
    assert!(error["error"].as_str().unwrap().contains("missing.jsonl"));
}

#[test]
fn test_unknown_file_human_error() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-H", "export", "missing.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: "));
}

#[test]
fn test_config_reports_sources() {
    let env = TestEnv::new();
    fs::write(env.path().join("gold-editor.kdl"), "port 9100\n").unwrap();

    let config = env.json(&["config"]);
    let settings = config["settings"].as_array().unwrap();
    let find = |key: &str| settings.iter().find(|s| s["key"] == key).unwrap().clone();

    assert_eq!(find("port")["value"], 9100);
    assert!(find("port")["source"].as_str().unwrap().starts_with("file:"));
    assert_eq!(find("data_root")["source"], "env:GOLD_EDITOR_DATA_ROOT");
    assert_eq!(find("host")["value"], "127.0.0.1");
    assert_eq!(find("host")["source"], "default");
    assert!(config["config_file"].is_string());
}

#[test]
fn test_config_env_overrides_file() {
    let env = TestEnv::new();
    fs::write(env.path().join("gold-editor.kdl"), "port 9100\n").unwrap();

    let output = env
        .cmd()
        .env("GOLD_EDITOR_PORT", "9200")
        .arg("config")
        .output()
        .unwrap();
    assert!(output.status.success());
    let config: Value = serde_json::from_slice(&output.stdout).unwrap();
    let port = config["settings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["key"] == "port")
        .unwrap()
        .clone();
    assert_eq!(port["value"], 9200);
    assert_eq!(port["source"], "env:GOLD_EDITOR_PORT");
}

#[test]
fn test_invalid_config_file_fails() {
    let env = TestEnv::new();
    fs::write(env.path().join("gold-editor.kdl"), "port \"not-a-number\"\n").unwrap();
    env.cmd().arg("config").assert().failure().code(1);
}
