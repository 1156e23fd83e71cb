//! Roster management endpoints (caller session required)

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use guild_common::api::CallerSession;
use guild_common::db::{Participant, RoleLabel};
use guild_common::Error;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::participants::RosterEntry;
use crate::services::priority::FinalizeSummary;
use crate::services::roster::{self, ParticipantEdit};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct DrawRequest {
    pub role: String,
}

/// GET /api/raids/:raid_id/participants
pub async fn list_participants(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Path(raid_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RosterEntry>>> {
    Ok(Json(roster::list_participants(&state.db, &session, raid_id).await?))
}

/// POST /api/participants/:participant_id/toggle_selected
pub async fn toggle_selected(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Path(participant_id): Path<Uuid>,
) -> ApiResult<Json<Participant>> {
    Ok(Json(roster::toggle_selected(&state.db, &session, participant_id).await?))
}

/// POST /api/participants/:participant_id/toggle_priority
pub async fn toggle_priority(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Path(participant_id): Path<Uuid>,
) -> ApiResult<Json<Participant>> {
    Ok(Json(roster::toggle_priority(&state.db, &session, participant_id).await?))
}

/// PATCH /api/participants/:participant_id
pub async fn edit_participant(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Path(participant_id): Path<Uuid>,
    Json(edit): Json<ParticipantEdit>,
) -> ApiResult<Json<Participant>> {
    Ok(Json(
        roster::edit_participant(&state.db, &session, participant_id, &edit).await?,
    ))
}

/// POST /api/raids/:raid_id/draw
pub async fn draw_random(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Path(raid_id): Path<Uuid>,
    Json(request): Json<DrawRequest>,
) -> ApiResult<Json<Participant>> {
    let role: RoleLabel = request
        .role
        .parse()
        .map_err(|e: guild_common::db::UnknownRole| Error::Validation(e.to_string()))?;
    Ok(Json(roster::draw_random(&state.db, &session, raid_id, role).await?))
}

/// POST /api/raids/:raid_id/finalize
pub async fn finalize_raid(
    State(state): State<AppState>,
    Extension(session): Extension<CallerSession>,
    Path(raid_id): Path<Uuid>,
) -> ApiResult<Json<FinalizeSummary>> {
    Ok(Json(roster::finalize_raid(&state.db, &session, raid_id).await?))
}

/// Roster routes behind the session middleware
pub fn roster_routes() -> Router<AppState> {
    Router::new()
        .route("/api/raids/:raid_id/participants", get(list_participants))
        .route("/api/raids/:raid_id/draw", post(draw_random))
        .route("/api/raids/:raid_id/finalize", post(finalize_raid))
        .route("/api/participants/:participant_id", patch(edit_participant))
        .route("/api/participants/:participant_id/toggle_selected", post(toggle_selected))
        .route("/api/participants/:participant_id/toggle_priority", post(toggle_priority))
}
