//! Web server exposing the editor API.
//!
//! Every handler that touches the edit session holds the session lock for
//! its whole operation, so requests are applied one at a time.

mod entries;
mod error;
mod export;
mod files;

pub use error::{ApiError, ApiResult};

use crate::Result;
use crate::commands::find_collection;
use crate::config::Settings;
use crate::models::Record;
use crate::session::EditSession;
use crate::storage::{CollectionInfo, read_jsonl};
use axum::Router;
use axum::routing::{get, post};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Resolved settings (data root, output roots, ...)
    pub settings: Arc<Settings>,
    /// The edit session, shared by all requests
    pub session: Arc<Mutex<EditSession>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            session: Arc::new(Mutex::new(EditSession::new())),
        }
    }

    /// Resolve a collection and read its records from disk.
    fn load(&self, file_id: &str) -> Result<(CollectionInfo, Vec<Record>)> {
        let info = find_collection(&self.settings, file_id)?;
        let records = read_jsonl(&info.path)?;
        Ok((info, records))
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/files", get(files::list_files))
        .route("/api/files/overview", get(files::overview))
        .route("/api/files/:file_id/stats", get(files::file_stats))
        .route("/api/files/:file_id/entries", get(entries::list_entries))
        .route("/api/files/:file_id/search", get(entries::search_entries))
        .route(
            "/api/files/:file_id/entries/:index",
            get(entries::get_entry).patch(entries::patch_entry),
        )
        .route(
            "/api/files/:file_id/entries/:index/reviewed",
            post(entries::mark_reviewed),
        )
        .route("/api/files/:file_id/save", post(entries::save_file))
        .route("/api/files/:file_id/export", get(export::export_file))
        .route("/api/session", get(entries::session_status))
        .route("/api/export/report", get(export::report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server and run until Ctrl+C.
pub async fn start_server(settings: Settings) -> Result<()> {
    let host: IpAddr = settings.host.parse().map_err(|e| {
        crate::Error::Config(format!("Invalid host address '{}': {}", settings.host, e))
    })?;
    let addr = SocketAddr::from((host, settings.port));

    info!(
        data_root = %settings.data_root.display(),
        reviewed_root = %settings.reviewed_root().display(),
        "starting gold-editor"
    );
    println!("Gold Editor serving {}", settings.data_root.display());
    println!("Open http://{} in your browser", addr);
    println!("Press Ctrl+C to stop");

    let state = AppState::new(settings);
    let session = state.session.clone();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let session = session.lock().await;
    if session.has_unsaved(None) {
        warn!(
            unsaved = session.unsaved_count(),
            "shutting down with unsaved edits; they are lost"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
