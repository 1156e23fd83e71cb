//! Priority (MOR) state machine
//!
//! A registration is in one of three states. Priority is granted explicitly
//! to an unselected registration and evaporates as soon as the player is
//! selected. Every transition updates the registration flag and the
//! player's `mor_status` record in one transaction.

use guild_common::db::Participant;
use guild_common::{Error, Result};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::db::{participants, priority, raids};

/// Selection/priority state of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    UnselectedNoPriority,
    UnselectedPriority,
    Selected,
}

impl ParticipantState {
    pub fn of(participant: &Participant) -> Self {
        match (participant.selected, participant.priority) {
            (true, _) => ParticipantState::Selected,
            (false, true) => ParticipantState::UnselectedPriority,
            (false, false) => ParticipantState::UnselectedNoPriority,
        }
    }
}

/// What `finalize_raid` repaired
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalizeSummary {
    /// Registrations that were selected and flagged at the same time
    pub repaired: Vec<Uuid>,
    pub removed_records: u64,
}

async fn load(conn: &mut SqliteConnection, participant_id: Uuid) -> Result<Participant> {
    participants::get_participant(&mut *conn, participant_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("participant {}", participant_id)))
}

/// Unselected-NoPriority → Unselected-Priority
///
/// Records the raid the player was passed over for. Rejected when the
/// registration is selected or flagged, or when the player already holds a
/// record from any raid.
pub async fn grant_priority(db: &SqlitePool, participant_id: Uuid) -> Result<Participant> {
    let mut tx = crate::db::begin_write(db).await?;
    let mut participant = load(&mut tx, participant_id).await?;

    match ParticipantState::of(&participant) {
        ParticipantState::Selected => {
            return Err(Error::InvalidState(format!(
                "participant {} is selected and cannot receive priority",
                participant_id
            )))
        }
        ParticipantState::UnselectedPriority => {
            return Err(Error::InvalidState(format!(
                "participant {} already holds priority",
                participant_id
            )))
        }
        ParticipantState::UnselectedNoPriority => {}
    }

    if let Some(existing) = priority::find_for_player(&mut *tx, participant.player_id).await? {
        return Err(Error::InvalidState(format!(
            "player {} already holds priority from raid {}",
            participant.player_id, existing.raid_id
        )));
    }

    let raid = raids::get_raid(&mut *tx, participant.raid_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("raid {}", participant.raid_id)))?;

    participants::set_priority(&mut *tx, participant_id, true).await?;
    priority::insert_record(
        &mut *tx,
        participant.player_id,
        participant.raid_id,
        &raid.caller_id,
        guild_common::time::now(),
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            Error::InvalidState(format!(
                "player {} already holds a priority record",
                participant.player_id
            ))
        } else {
            e
        }
    })?;

    tx.commit().await?;

    participant.priority = true;
    info!(participant_id = %participant_id, raid_id = %participant.raid_id, "Priority granted");
    Ok(participant)
}

/// Unselected-Priority → Unselected-NoPriority
pub async fn revoke_priority(db: &SqlitePool, participant_id: Uuid) -> Result<Participant> {
    let mut tx = crate::db::begin_write(db).await?;
    let mut participant = load(&mut tx, participant_id).await?;

    if !participant.priority {
        return Err(Error::InvalidState(format!(
            "participant {} does not hold priority",
            participant_id
        )));
    }

    participants::set_priority(&mut *tx, participant_id, false).await?;
    priority::delete_for_player(&mut *tx, participant.player_id).await?;
    tx.commit().await?;

    participant.priority = false;
    info!(participant_id = %participant_id, "Priority revoked");
    Ok(participant)
}

/// Any state → Selected
///
/// Clears the player's priority flag on every registration and deletes the
/// player's active record.
pub async fn select(db: &SqlitePool, participant_id: Uuid) -> Result<Participant> {
    let mut tx = crate::db::begin_write(db).await?;
    let mut participant = load(&mut tx, participant_id).await?;

    participants::set_selected(&mut *tx, participant_id, true).await?;
    let cleared = participants::clear_priority_for_player(&mut *tx, participant.player_id).await?;
    let removed = priority::delete_for_player(&mut *tx, participant.player_id).await?;
    tx.commit().await?;

    participant.selected = true;
    participant.priority = false;
    info!(
        participant_id = %participant_id,
        cleared_flags = cleared,
        removed_records = removed,
        "Participant selected"
    );
    Ok(participant)
}

/// Selected → Unselected-NoPriority; priority is not granted implicitly
pub async fn deselect(db: &SqlitePool, participant_id: Uuid) -> Result<Participant> {
    let mut tx = crate::db::begin_write(db).await?;
    let mut participant = load(&mut tx, participant_id).await?;

    participants::set_selected(&mut *tx, participant_id, false).await?;
    tx.commit().await?;

    participant.selected = false;
    info!(participant_id = %participant_id, "Participant deselected");
    Ok(participant)
}

/// Consistency sweep run when a raid closes
///
/// Forces priority off on registrations that are selected and flagged, and
/// deletes records of this raid that no longer mirror a flagged
/// registration.
pub async fn finalize_raid(db: &SqlitePool, raid_id: Uuid) -> Result<FinalizeSummary> {
    let mut tx = crate::db::begin_write(db).await?;

    if raids::get_raid(&mut *tx, raid_id).await?.is_none() {
        return Err(Error::NotFound(format!("raid {}", raid_id)));
    }

    let mut summary = FinalizeSummary::default();

    for participant in participants::list_selected_with_priority(&mut *tx, raid_id).await? {
        participants::set_priority(&mut *tx, participant.id, false).await?;
        summary.removed_records += priority::delete_for_player(&mut *tx, participant.player_id).await?;
        summary.repaired.push(participant.id);
    }

    summary.removed_records += priority::delete_orphaned_for_raid(&mut *tx, raid_id).await?;
    tx.commit().await?;

    info!(
        raid_id = %raid_id,
        repaired = summary.repaired.len(),
        removed_records = summary.removed_records,
        "Raid finalized"
    );
    Ok(summary)
}
