//! Record endpoints: listing, search, patching and saving.

use super::{ApiResult, AppState};
use crate::models::{EntryUpdate, Record};
use crate::query::{self, DEFAULT_PAGE_SIZE, EntryFilter, EntryPage, Page};
use crate::session::{
    EditSession, EntryEdit, SaveOutcome, apply_patch, merge_with_disk, save_all, toggle_reviewed,
};
use crate::{Error, Result};
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of history entries returned by the session endpoint.
const RECENT_HISTORY: usize = 20;

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub index: usize,
    pub entry: Record,
    pub has_unsaved: bool,
    /// Other records updated by role propagation
    pub synced_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    pub backup_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub has_unsaved: bool,
    pub unsaved_count: usize,
    pub history_len: usize,
    /// Most recent edits, oldest first
    pub recent: Vec<EntryEdit>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub page: usize,
    pub page_size: usize,
    pub filter_non_null: bool,
    pub filter_treatment: bool,
    pub filter_bool_slots: bool,
    pub filter_qa_hint: bool,
    pub search: String,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filter_non_null: false,
            filter_treatment: false,
            filter_bool_slots: false,
            filter_qa_hint: false,
            search: String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
}

/// Validate a path index against the collection length.
fn position(index: i64, len: usize, file_id: &str) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&position| position < len)
        .ok_or_else(|| Error::NotFound(format!("Entry {} not found in {}", index, file_id)))
}

fn effective(session: &EditSession, collection: &str, disk: Vec<Record>) -> Vec<Record> {
    merge_with_disk(session, collection, disk)
}

/// Filtered, paginated listing of effective records.
pub async fn list_entries(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<EntryPage>> {
    let page = Page::new(params.page, params.page_size)?;
    let filter = EntryFilter {
        filter_non_null: params.filter_non_null,
        filter_treatment: params.filter_treatment,
        filter_bool_slots: params.filter_bool_slots,
        filter_qa_hint: params.filter_qa_hint,
        search: params.search,
    };

    let session = state.session.lock().await;
    let (info, disk) = state.load(&file_id)?;
    let records = effective(&session, &info.relative_path, disk);
    Ok(Json(query::list_entries(&records, &filter, page)))
}

/// Free-text search over effective records.
pub async fn search_entries(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<EntryPage>> {
    if params.q.is_empty() {
        return Err(Error::InvalidInput("query parameter q must not be empty".to_string()).into());
    }

    let session = state.session.lock().await;
    let (info, disk) = state.load(&file_id)?;
    let records = effective(&session, &info.relative_path, disk);
    Ok(Json(query::search_entries(&records, &params.q)))
}

/// One effective record.
pub async fn get_entry(
    State(state): State<AppState>,
    Path((file_id, index)): Path<(String, i64)>,
) -> ApiResult<Json<EntryResponse>> {
    let session = state.session.lock().await;
    let (info, mut disk) = state.load(&file_id)?;
    let position = position(index, disk.len(), &file_id)?;

    let unsaved = session.get_effective(&info.relative_path, position);
    let has_unsaved = unsaved.is_some();
    let entry = match unsaved {
        Some(record) => record.clone(),
        None => disk.swap_remove(position),
    };

    Ok(Json(EntryResponse {
        index: position,
        entry,
        has_unsaved,
        synced_count: 0,
    }))
}

/// Apply a partial update; buffered in the session, not written to disk.
pub async fn patch_entry(
    State(state): State<AppState>,
    Path((file_id, index)): Path<(String, i64)>,
    Json(update): Json<EntryUpdate>,
) -> ApiResult<Json<EntryResponse>> {
    let mut session = state.session.lock().await;
    let (info, disk) = state.load(&file_id)?;
    let position = position(index, disk.len(), &file_id)?;
    let collection = info.relative_path.as_str();

    let outcome = apply_patch(&mut session, collection, &disk, position, &update)?;
    if outcome.synced_count > 0 {
        info!(
            collection,
            position,
            synced = outcome.synced_count,
            "role change propagated"
        );
    }

    Ok(Json(EntryResponse {
        index: position,
        has_unsaved: session.get_effective(collection, position).is_some(),
        entry: outcome.record,
        synced_count: outcome.synced_count,
    }))
}

/// Toggle the reviewed flag and persist the collection's working copy.
pub async fn mark_reviewed(
    State(state): State<AppState>,
    Path((file_id, index)): Path<(String, i64)>,
) -> ApiResult<Json<EntryResponse>> {
    let mut session = state.session.lock().await;
    let (info, disk) = state.load(&file_id)?;
    let position = position(index, disk.len(), &file_id)?;

    let entry = toggle_reviewed(
        &mut session,
        &info.relative_path,
        &info.path,
        position,
        &state.settings.reviewed_root(),
    )?;

    Ok(Json(EntryResponse {
        index: position,
        entry,
        has_unsaved: false,
        synced_count: 0,
    }))
}

/// Write every buffered edit of a collection to its working copy.
pub async fn save_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<SaveResponse>> {
    let mut session = state.session.lock().await;
    let info = crate::commands::find_collection(&state.settings, &file_id)?;

    let outcome = save_all(
        &mut session,
        &info.relative_path,
        &info.path,
        &state.settings.reviewed_root(),
    )?;

    Ok(Json(match outcome {
        SaveOutcome::NoChanges => SaveResponse {
            success: true,
            message: "No changes to save".to_string(),
            backup_path: None,
        },
        SaveOutcome::Saved { path } => SaveResponse {
            success: true,
            message: format!("Saved {}", info.relative_path),
            backup_path: Some(path.display().to_string()),
        },
    }))
}

/// Unsaved edit count and recent history.
pub async fn session_status(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.session.lock().await;
    let history_len = session.history().len();
    let recent = session
        .history()
        .skip(history_len.saturating_sub(RECENT_HISTORY))
        .cloned()
        .collect();

    Json(SessionResponse {
        has_unsaved: session.has_unsaved(None),
        unsaved_count: session.unsaved_count(),
        history_len,
        recent,
    })
}
