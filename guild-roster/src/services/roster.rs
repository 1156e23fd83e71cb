//! Raid roster manager
//!
//! Operations a caller performs on the roster of one of their raids. Every
//! call takes the caller's [`CallerSession`] and refuses raids owned by
//! another caller.

use guild_common::api::CallerSession;
use guild_common::db::{Participant, Raid, RoleLabel};
use guild_common::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::participants::{self, RosterEntry};
use crate::db::raids;
use crate::services::priority::{self, FinalizeSummary};

/// Caller edit of a registration; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantEdit {
    pub role: Option<String>,
    pub gear_level: Option<i64>,
}

/// Load a raid the session is allowed to manage
pub async fn authorize_raid(db: &SqlitePool, session: &CallerSession, raid_id: Uuid) -> Result<Raid> {
    let raid = raids::get_raid(db, raid_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("raid {}", raid_id)))?;

    if !session.owns(&raid.caller_id) {
        return Err(Error::Forbidden(format!(
            "raid {} belongs to another caller",
            raid_id
        )));
    }

    Ok(raid)
}

/// Load a registration whose raid the session is allowed to manage
pub async fn authorize_participant(
    db: &SqlitePool,
    session: &CallerSession,
    participant_id: Uuid,
) -> Result<Participant> {
    let participant = participants::get_participant(db, participant_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("participant {}", participant_id)))?;

    authorize_raid(db, session, participant.raid_id).await?;
    Ok(participant)
}

pub async fn list_participants(
    db: &SqlitePool,
    session: &CallerSession,
    raid_id: Uuid,
) -> Result<Vec<RosterEntry>> {
    authorize_raid(db, session, raid_id).await?;
    participants::list_roster(db, raid_id).await
}

/// Select an unselected registration, deselect a selected one
pub async fn toggle_selected(
    db: &SqlitePool,
    session: &CallerSession,
    participant_id: Uuid,
) -> Result<Participant> {
    let participant = authorize_participant(db, session, participant_id).await?;

    if participant.selected {
        priority::deselect(db, participant_id).await
    } else {
        priority::select(db, participant_id).await
    }
}

/// Grant priority to an unflagged registration, revoke it from a flagged one
pub async fn toggle_priority(
    db: &SqlitePool,
    session: &CallerSession,
    participant_id: Uuid,
) -> Result<Participant> {
    let participant = authorize_participant(db, session, participant_id).await?;

    if participant.priority {
        priority::revoke_priority(db, participant_id).await
    } else {
        priority::grant_priority(db, participant_id).await
    }
}

/// Draw one registration of the raid holding `role`, uniformly at random
pub async fn draw_random(
    db: &SqlitePool,
    session: &CallerSession,
    raid_id: Uuid,
    role: RoleLabel,
) -> Result<Participant> {
    authorize_raid(db, session, raid_id).await?;

    let candidates = participants::list_by_role(db, raid_id, role).await?;
    let drawn = pick_random(&candidates, &mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| Error::EmptySet(format!("no participant of raid {} holds role {}", raid_id, role)))?;

    info!(raid_id = %raid_id, role = %role, participant_id = %drawn.id, "Random draw");
    Ok(drawn)
}

/// Uniform pick over `candidates`
pub fn pick_random<'a, R: Rng + ?Sized>(candidates: &'a [Participant], rng: &mut R) -> Option<&'a Participant> {
    candidates.choose(rng)
}

/// Caller edit of role and gear level
pub async fn edit_participant(
    db: &SqlitePool,
    session: &CallerSession,
    participant_id: Uuid,
    edit: &ParticipantEdit,
) -> Result<Participant> {
    authorize_participant(db, session, participant_id).await?;

    let role = edit
        .role
        .as_deref()
        .map(|r| r.parse::<RoleLabel>().map_err(|e| Error::Validation(e.to_string())))
        .transpose()?;

    if let Some(gear_level) = edit.gear_level {
        if gear_level < 0 {
            return Err(Error::Validation(format!(
                "gear level must not be negative (got {})",
                gear_level
            )));
        }
    }

    participants::update_fields(db, participant_id, role, edit.gear_level).await?;

    participants::get_participant(db, participant_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("participant {}", participant_id)))
}

pub async fn finalize_raid(
    db: &SqlitePool,
    session: &CallerSession,
    raid_id: Uuid,
) -> Result<FinalizeSummary> {
    authorize_raid(db, session, raid_id).await?;
    priority::finalize_raid(db, raid_id).await
}
