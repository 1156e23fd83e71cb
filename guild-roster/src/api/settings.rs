//! Settings API endpoint
//!
//! POST /api/settings/raid_helper_api_key stores the key in the database,
//! the highest-priority source.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/raid_helper_api_key
///
/// **Errors:** 400 for an empty or whitespace-only key.
pub async fn set_raid_helper_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    crate::db::settings::set_raid_helper_api_key(&state.db, payload.api_key.trim().to_string())
        .await?;

    info!("Raid Helper API key configured via web UI");

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Raid Helper API key saved".to_string(),
    }))
}

/// Settings routes behind the session middleware
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/raid_helper_api_key", post(set_raid_helper_api_key))
}
