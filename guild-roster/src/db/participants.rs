//! Raid registration persistence

use guild_common::db::{Participant, PlayerIdentity, RoleLabel};
use guild_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{parse_role, parse_uuid};

const PARTICIPANT_COLUMNS: &str = "id, raid_id, player_id, role, secondary_role, ip, selected, mor";

/// Roster line shown to the caller
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub participant: Participant,
    pub player_name: String,
    pub identity: PlayerIdentity,
    /// Player holds an active priority record, from this raid or another
    pub owed_priority: bool,
}

pub(crate) fn participant_from_row(row: &SqliteRow) -> Result<Participant> {
    let id: String = row.try_get("id")?;
    let raid_id: String = row.try_get("raid_id")?;
    let player_id: String = row.try_get("player_id")?;
    let role: String = row.try_get("role")?;
    let secondary_role: Option<String> = row.try_get("secondary_role")?;

    Ok(Participant {
        id: parse_uuid("raid_registrations.id", &id)?,
        raid_id: parse_uuid("raid_registrations.raid_id", &raid_id)?,
        player_id: parse_uuid("raid_registrations.player_id", &player_id)?,
        role: parse_role("raid_registrations.role", &role)?,
        secondary_role: secondary_role
            .as_deref()
            .map(|r| parse_role("raid_registrations.secondary_role", r))
            .transpose()?,
        gear_level: row.try_get("ip")?,
        selected: row.try_get("selected")?,
        priority: row.try_get("mor")?,
    })
}

/// Load registration by primary key
pub async fn get_participant<'e, E>(executor: E, participant_id: Uuid) -> Result<Option<Participant>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM raid_registrations WHERE id = ?", PARTICIPANT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(participant_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(participant_from_row).transpose()
}

/// Load the registration of a player for a raid
pub async fn find_for_player<'e, E>(
    executor: E,
    raid_id: Uuid,
    player_id: Uuid,
) -> Result<Option<Participant>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM raid_registrations WHERE raid_id = ? AND player_id = ?",
        PARTICIPANT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(raid_id.to_string())
        .bind(player_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(participant_from_row).transpose()
}

/// All registrations of a raid, in insertion order
pub async fn list_for_raid<'e, E>(executor: E, raid_id: Uuid) -> Result<Vec<Participant>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM raid_registrations WHERE raid_id = ? ORDER BY created_at, rowid",
        PARTICIPANT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(raid_id.to_string())
        .fetch_all(executor)
        .await?;

    rows.iter().map(participant_from_row).collect()
}

/// Registrations of a raid holding `role` as their primary role
pub async fn list_by_role<'e, E>(executor: E, raid_id: Uuid, role: RoleLabel) -> Result<Vec<Participant>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM raid_registrations WHERE raid_id = ? AND role = ? ORDER BY rowid",
        PARTICIPANT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(raid_id.to_string())
        .bind(role.as_str())
        .fetch_all(executor)
        .await?;

    rows.iter().map(participant_from_row).collect()
}

/// Delete every registration of a raid
pub async fn delete_for_raid<'e, E>(executor: E, raid_id: Uuid) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM raid_registrations WHERE raid_id = ?")
        .bind(raid_id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Insert a fresh registration (unselected, no priority)
pub async fn insert_participant<'e, E>(
    executor: E,
    raid_id: Uuid,
    player_id: Uuid,
    role: RoleLabel,
    secondary_role: Option<RoleLabel>,
    gear_level: i64,
) -> Result<Participant>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let participant = Participant {
        id: Uuid::new_v4(),
        raid_id,
        player_id,
        role,
        secondary_role,
        gear_level,
        selected: false,
        priority: false,
    };

    sqlx::query(
        r#"
        INSERT INTO raid_registrations (id, raid_id, player_id, role, secondary_role, ip, selected, mor)
        VALUES (?, ?, ?, ?, ?, ?, 0, 0)
        "#,
    )
    .bind(participant.id.to_string())
    .bind(raid_id.to_string())
    .bind(player_id.to_string())
    .bind(role.as_str())
    .bind(secondary_role.map(|r| r.as_str()))
    .bind(gear_level)
    .execute(executor)
    .await?;

    Ok(participant)
}

/// Overwrite the self-reported fields of a registration
///
/// Selection and priority flags are left alone.
pub async fn update_signup<'e, E>(
    executor: E,
    participant_id: Uuid,
    role: RoleLabel,
    secondary_role: Option<RoleLabel>,
    gear_level: i64,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE raid_registrations SET role = ?, secondary_role = ?, ip = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(secondary_role.map(|r| r.as_str()))
        .bind(gear_level)
        .bind(participant_id.to_string())
        .execute(executor)
        .await?;

    Ok(())
}

/// Caller edit of role and/or gear level; `None` keeps the stored value
pub async fn update_fields<'e, E>(
    executor: E,
    participant_id: Uuid,
    role: Option<RoleLabel>,
    gear_level: Option<i64>,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE raid_registrations SET role = COALESCE(?, role), ip = COALESCE(?, ip) WHERE id = ?",
    )
    .bind(role.map(|r| r.as_str()))
    .bind(gear_level)
    .bind(participant_id.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn set_selected<'e, E>(executor: E, participant_id: Uuid, selected: bool) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE raid_registrations SET selected = ? WHERE id = ?")
        .bind(selected)
        .bind(participant_id.to_string())
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn set_priority<'e, E>(executor: E, participant_id: Uuid, priority: bool) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE raid_registrations SET mor = ? WHERE id = ?")
        .bind(priority)
        .bind(participant_id.to_string())
        .execute(executor)
        .await?;

    Ok(())
}

/// Clear the priority flag on every registration of a player
pub async fn clear_priority_for_player<'e, E>(executor: E, player_id: Uuid) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE raid_registrations SET mor = 0 WHERE player_id = ? AND mor = 1")
        .bind(player_id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Registrations of a raid that are both selected and flagged priority
pub async fn list_selected_with_priority<'e, E>(executor: E, raid_id: Uuid) -> Result<Vec<Participant>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM raid_registrations WHERE raid_id = ? AND selected = 1 AND mor = 1",
        PARTICIPANT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(raid_id.to_string())
        .fetch_all(executor)
        .await?;

    rows.iter().map(participant_from_row).collect()
}

/// Roster of a raid: owed or flagged priority first, then gear level, then name
pub async fn list_roster(pool: &SqlitePool, raid_id: Uuid) -> Result<Vec<RosterEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT rr.id, rr.raid_id, rr.player_id, rr.role, rr.secondary_role, rr.ip,
               rr.selected, rr.mor, p.name AS player_name, p.discord_id AS player_discord_id,
               EXISTS(SELECT 1 FROM mor_status ms WHERE ms.player_id = rr.player_id) AS owed
        FROM raid_registrations rr
        JOIN players p ON p.id = rr.player_id
        WHERE rr.raid_id = ?
        ORDER BY (rr.mor = 1 OR EXISTS(SELECT 1 FROM mor_status ms WHERE ms.player_id = rr.player_id)) DESC,
                 rr.ip DESC, p.name ASC
        "#,
    )
    .bind(raid_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let discord_id: Option<String> = row.try_get("player_discord_id")?;
            Ok(RosterEntry {
                participant: participant_from_row(row)?,
                player_name: row.try_get("player_name")?,
                identity: if discord_id.is_some() {
                    PlayerIdentity::Verified
                } else {
                    PlayerIdentity::Unverified
                },
                owed_priority: row.try_get("owed")?,
            })
        })
        .collect()
}
