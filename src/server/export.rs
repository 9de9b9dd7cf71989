//! Export and reporting endpoints.

use super::{ApiResult, AppState};
use crate::models::Record;
use crate::report::{ExportReport, build_report};
use crate::session::merge_with_disk;
use crate::storage::clean_entries;
use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub file_id: String,
    pub entries: Vec<Record>,
    pub total: usize,
}

/// Clean view of a collection's effective records (unsaved edits included).
pub async fn export_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<ExportResponse>> {
    let session = state.session.lock().await;
    let (info, disk) = state.load(&file_id)?;
    let entries = clean_entries(&merge_with_disk(&session, &info.relative_path, disk));

    Ok(Json(ExportResponse {
        file_id,
        total: entries.len(),
        entries,
    }))
}

/// Slot statistics over every collection under the data root.
pub async fn report(State(state): State<AppState>) -> ApiResult<Json<ExportReport>> {
    Ok(Json(build_report(&state.settings.data_root)?))
}
