//! Raid Helper sync trigger

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::services::reconciler::{self, ReconciliationReport};
use crate::{ApiError, AppState};

/// Sync outcome
///
/// A batch that could not start carries `success: false`, the error and no
/// report.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconciliationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/sync
///
/// Only one batch runs at a time; a concurrent request gets 409.
pub async fn run_sync(State(state): State<AppState>) -> Result<(StatusCode, Json<SyncResponse>), ApiError> {
    let _guard = state
        .sync_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("a sync is already running".to_string()))?;

    info!("Starting Raid Helper sync");

    let api_key = crate::config::resolve_raid_helper_api_key(&state.db, &state.config).await;
    let outcome = match api_key {
        Ok(api_key) => reconciler::reconcile_from_feed(&state.db, &state.feed, api_key.as_deref()).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(report) => Ok((
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                report: Some(report),
                error: None,
            }),
        )),
        Err(e) => {
            warn!("Sync failed: {}", e);
            let message = e.to_string();
            Ok((
                ApiError::from(e).status(),
                Json(SyncResponse {
                    success: false,
                    report: None,
                    error: Some(message),
                }),
            ))
        }
    }
}

/// Sync routes behind the session middleware
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/api/sync", post(run_sync))
}
