//! Collection listing endpoints.

use super::{ApiResult, AppState};
use crate::commands::{self, FileList, find_collection};
use crate::report::FileStats;
use crate::storage::{self, Overview, read_jsonl};
use axum::Json;
use axum::extract::{Path, State};

/// All collections under the data root.
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileList>> {
    Ok(Json(commands::files(&state.settings)?))
}

/// Pending / reviewed / skipped grouping.
pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<Overview>> {
    let settings = &state.settings;
    Ok(Json(storage::overview(
        &settings.data_root,
        &settings.reviewed_root(),
        &settings.skipped_root(),
    )?))
}

/// Statistics for one collection, as stored on disk.
pub async fn file_stats(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<FileStats>> {
    let info = find_collection(&state.settings, &file_id)?;
    let records = read_jsonl(&info.path)?;
    Ok(Json(FileStats::new(&info, &records)))
}
