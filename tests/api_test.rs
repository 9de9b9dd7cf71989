//! HTTP API tests, driven through the router without binding a socket.

#![cfg(feature = "server")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use common::TestEnv;
use gold_editor::config::Settings;
use gold_editor::server::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

const FILE: &str = "clinic__chat.jsonl";

fn app(env: &TestEnv) -> Router {
    router(AppState::new(Settings::new(env.data_root())))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn patch(app: &Router, index: usize, update: Value) -> (StatusCode, Value) {
    let uri = format!("/api/files/{}/entries/{}", FILE, index);
    send(app, Method::PATCH, &uri, Some(update)).await
}

#[tokio::test]
async fn test_list_files() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (status, body) = get(&app, "/api/files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 1);
    assert_eq!(body["files"][0]["id"], FILE);
    assert_eq!(body["files"][0]["entry_count"], 3);
}

#[tokio::test]
async fn test_role_change_propagates_to_context() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (status, body) = patch(&app, 0, json!({"message_role": "brand"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["synced_count"], 1);
    assert_eq!(body["has_unsaved"], true);
    assert_eq!(body["entry"]["message"]["role"], "brand");

    let (_, second) = get(&app, &format!("/api/files/{}/entries/1", FILE)).await;
    assert_eq!(second["has_unsaved"], true);
    assert_eq!(second["entry"]["context"][0]["role"], "brand");
    assert_eq!(second["entry"]["message"]["role"], "client");

    let (_, third) = get(&app, &format!("/api/files/{}/entries/2", FILE)).await;
    assert_eq!(third["has_unsaved"], false);

    // Nothing left to change on the second attempt.
    let (_, again) = patch(&app, 0, json!({"message_role": "brand"})).await;
    assert_eq!(again["synced_count"], 0);

    // Buffered only; the file is untouched.
    let disk = env.read_jsonl(&env.data_root().join("clinic/chat.jsonl"));
    assert_eq!(disk[1]["context"][0]["role"], "client");
}

#[tokio::test]
async fn test_context_update_propagates_to_main_message() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (_, body) = patch(
        &app,
        1,
        json!({"context_updates": [{"index": 0, "role": "brand"}]}),
    )
    .await;
    assert_eq!(body["entry"]["context"][0]["role"], "brand");
    assert_eq!(body["synced_count"], 1);

    let (_, first) = get(&app, &format!("/api/files/{}/entries/0", FILE)).await;
    assert_eq!(first["entry"]["message"]["role"], "brand");
}

#[tokio::test]
async fn test_hair_areas_become_a_list() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (status, body) = patch(
        &app,
        2,
        json!({"slots": {"hair_removal_areas": "legs, arms,,face", "name": "Olena"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["entry"]["gold"]["slots"]["hair_removal_areas"],
        json!(["legs", "arms", "face"])
    );
    assert_eq!(body["entry"]["gold"]["slots"]["name"], "Olena");
    assert_eq!(body["synced_count"], 0);
}

#[tokio::test]
async fn test_reviewed_toggle_writes_working_copy() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let uri = format!("/api/files/{}/entries/2/reviewed", FILE);
    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["reviewed"], true);
    assert_eq!(body["has_unsaved"], false);

    let working = env.reviewed_root().join("clinic/chat.jsonl");
    let records = env.read_jsonl(&working);
    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["reviewed"], true);

    let (_, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(body["entry"]["reviewed"], false);
    assert_eq!(env.read_jsonl(&working)[2]["reviewed"], false);

    // The primary collection is never written.
    let original = env.read_jsonl(&env.data_root().join("clinic/chat.jsonl"));
    assert!(original[2].get("reviewed").is_none());
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let env = TestEnv::with_conversation();
    let app = app(&env);
    let save = format!("/api/files/{}/save", FILE);

    let (_, body) = send(&app, Method::POST, &save, None).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "No changes to save");

    patch(&app, 0, json!({"qa_hint": "check role"})).await;
    let (status, body) = send(&app, Method::POST, &save, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Saved clinic/chat.jsonl");
    assert!(body["backup_path"].is_string());

    let working = env.reviewed_root().join("clinic/chat.jsonl");
    assert_eq!(env.read_jsonl(&working)[0]["qa_hint"], "check role");

    let (_, body) = send(&app, Method::POST, &save, None).await;
    assert_eq!(body["message"], "No changes to save");

    let (_, session) = get(&app, "/api/session").await;
    assert_eq!(session["has_unsaved"], false);
    assert_eq!(session["unsaved_count"], 0);
}

#[tokio::test]
async fn test_saved_collection_moves_to_reviewed() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (_, before) = get(&app, "/api/files/overview").await;
    assert_eq!(before["pending"].as_array().unwrap().len(), 1);
    assert_eq!(before["reviewed"], json!([]));

    patch(&app, 1, json!({"reviewed": true})).await;
    send(&app, Method::POST, &format!("/api/files/{}/save", FILE), None).await;

    let (_, after) = get(&app, "/api/files/overview").await;
    assert_eq!(after["pending"], json!([]));
    assert_eq!(after["reviewed"].as_array().unwrap().len(), 1);

    // Reads now come from the working copy.
    let (_, entry) = get(&app, &format!("/api/files/{}/entries/1", FILE)).await;
    assert_eq!(entry["entry"]["reviewed"], true);
    assert_eq!(entry["has_unsaved"], false);
}

#[tokio::test]
async fn test_missing_file_and_index_are_404() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (status, body) = get(&app, "/api/files/missing.jsonl/entries/0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("missing.jsonl"));

    let (status, _) = get(&app, &format!("/api/files/{}/entries/3", FILE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, &format!("/api/files/{}/entries/-1", FILE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = patch(&app, 7, json!({"qa_hint": "x"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_entries_paginates_and_filters() {
    let env = TestEnv::with_conversation();
    let app = app(&env);
    let base = format!("/api/files/{}/entries", FILE);

    let (status, page) = get(&app, &format!("{}?page=2&page_size=2", base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["entries"].as_array().unwrap().len(), 1);
    assert_eq!(page["entries"][0]["_original_index"], 2);

    patch(&app, 1, json!({"slots": {"treatment": "laser"}})).await;
    let (_, filtered) = get(&app, &format!("{}?filter_treatment=true", base)).await;
    assert_eq!(filtered["total"], 1);
    assert_eq!(filtered["entries"][0]["_original_index"], 1);

    let (status, far) = get(&app, &format!("{}?page={}", base, usize::MAX / 2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(far["total"], 3);
    assert_eq!(far["entries"], json!([]));

    let (status, _) = get(&app, &format!("{}?page_size=0", base)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search() {
    let env = TestEnv::with_conversation();
    let app = app(&env);
    let base = format!("/api/files/{}/search", FILE);

    let (status, found) = get(&app, &format!("{}?q=First", base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["total"], 2);

    let (status, body) = get(&app, &format!("{}?q=", base)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, _) = get(&app, &base).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_is_clean_and_includes_unsaved_edits() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    patch(
        &app,
        0,
        json!({"slots": {"name": "Olena"}, "evidence": {"name": "First"}, "qa_hint": "ok"}),
    )
    .await;

    let (status, body) = get(&app, &format!("/api/files/{}/export", FILE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let first = &body["entries"][0];
    assert_eq!(first["gold"]["slots"]["name"], "Olena");
    assert!(first["gold"].get("evidence").is_none());
    assert!(first.get("qa_hint").is_none());
    assert!(first["gold"]["slots"].get("treatment").is_none());
}

#[tokio::test]
async fn test_session_tracks_history() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (_, empty) = get(&app, "/api/session").await;
    assert_eq!(empty["has_unsaved"], false);
    assert_eq!(empty["history_len"], 0);

    patch(&app, 0, json!({"message_role": "brand"})).await;

    let (_, session) = get(&app, "/api/session").await;
    assert_eq!(session["has_unsaved"], true);
    assert_eq!(session["unsaved_count"], 2);
    assert_eq!(session["history_len"], 2);
    assert_eq!(session["recent"][0]["field_path"], "message.role");
    assert_eq!(session["recent"][1]["field_path"], "context[0].role");
    assert_eq!(session["recent"][1]["new_value"], "brand");
}

#[tokio::test]
async fn test_stats_and_report() {
    let env = TestEnv::with_conversation();
    let app = app(&env);

    let (status, _) = get(&app, &format!("/api/files/{}/stats", FILE)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = get(&app, "/api/export/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_entries"], 3);
}
