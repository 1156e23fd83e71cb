//! Raid endpoints: public info and signup form, caller-side creation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use guild_common::api::CallerSession;
use guild_common::db::{Participant, Raid};
use uuid::Uuid;

use crate::db::priority::PriorityRecordView;
use crate::services::raids::{self, CreateRaid, RaidInfo, SignupForm};
use crate::{ApiResult, AppState};

/// GET /api/raids/:raid_id
pub async fn get_raid_info(
    State(state): State<AppState>,
    Path(raid_id): Path<Uuid>,
) -> ApiResult<Json<RaidInfo>> {
    Ok(Json(raids::get_raid_info(&state.db, raid_id).await?))
}

/// POST /api/raids/:raid_id/signups
pub async fn submit_signup(
    State(state): State<AppState>,
    Path(raid_id): Path<Uuid>,
    Json(form): Json<SignupForm>,
) -> ApiResult<(StatusCode, Json<Participant>)> {
    let participant = raids::submit_signup(&state.db, raid_id, &form).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// GET /api/mor
pub async fn list_priority_records(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PriorityRecordView>>> {
    Ok(Json(raids::list_priority_records(&state.db).await?))
}

/// POST /api/raids (caller session required)
pub async fn create_raid(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Json(request): Json<CreateRaid>,
) -> ApiResult<(StatusCode, Json<Raid>)> {
    let raid = raids::create_raid_manually(&state.db, &session, &request).await?;
    Ok((StatusCode::CREATED, Json(raid)))
}

/// Public raid routes
pub fn public_raid_routes() -> Router<AppState> {
    Router::new()
        .route("/api/raids/:raid_id", get(get_raid_info))
        .route("/api/raids/:raid_id/signups", post(submit_signup))
        .route("/api/mor", get(list_priority_records))
}

/// Raid routes behind the session middleware
pub fn protected_raid_routes() -> Router<AppState> {
    Router::new().route("/api/raids", post(create_raid))
}
