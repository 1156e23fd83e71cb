//! Caller and raid listing

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use guild_common::db::Caller;

use crate::db::raids::RaidSummary;
use crate::services::raids;
use crate::{ApiResult, AppState};

/// GET /api/callers
pub async fn list_callers(State(state): State<AppState>) -> ApiResult<Json<Vec<Caller>>> {
    Ok(Json(raids::list_callers(&state.db).await?))
}

/// GET /api/callers/:caller_id/raids
pub async fn list_caller_raids(
    State(state): State<AppState>,
    Path(caller_id): Path<String>,
) -> ApiResult<Json<Vec<RaidSummary>>> {
    Ok(Json(raids::list_raids_for_caller(&state.db, &caller_id).await?))
}

/// Public caller routes
pub fn caller_routes() -> Router<AppState> {
    Router::new()
        .route("/api/callers", get(list_callers))
        .route("/api/callers/:caller_id/raids", get(list_caller_raids))
        .route("/api/callers/:caller_id/login", post(super::auth::login))
}
