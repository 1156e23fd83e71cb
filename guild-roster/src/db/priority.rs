//! Priority (MOR) record persistence
//!
//! `mor_status.player_id` is unique: a player holds at most one active record.

use chrono::{DateTime, Utc};
use guild_common::db::{PriorityRecord, RoleLabel};
use guild_common::time::{from_db, to_db};
use guild_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{parse_role, parse_uuid};

/// Active record with the names needed by the MOR status page
#[derive(Debug, Clone, Serialize)]
pub struct PriorityRecordView {
    #[serde(flatten)]
    pub record: PriorityRecord,
    pub player_name: String,
    pub raid_title: String,
    pub caller_name: Option<String>,
    pub role: Option<RoleLabel>,
    pub secondary_role: Option<RoleLabel>,
    pub gear_level: Option<i64>,
}

fn record_from_row(row: &SqliteRow) -> Result<PriorityRecord> {
    let id: String = row.try_get("id")?;
    let player_id: String = row.try_get("player_id")?;
    let raid_id: String = row.try_get("raid_id")?;
    let date: String = row.try_get("date")?;

    Ok(PriorityRecord {
        id: parse_uuid("mor_status.id", &id)?,
        player_id: parse_uuid("mor_status.player_id", &player_id)?,
        raid_id: parse_uuid("mor_status.raid_id", &raid_id)?,
        caller_id: row.try_get("caller_id")?,
        granted_at: from_db(&date)?,
    })
}

/// Insert the player's active record
///
/// Fails with a unique violation when the player already holds one.
pub async fn insert_record<'e, E>(
    executor: E,
    player_id: Uuid,
    raid_id: Uuid,
    caller_id: &str,
    granted_at: DateTime<Utc>,
) -> Result<PriorityRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let record = PriorityRecord {
        id: Uuid::new_v4(),
        player_id,
        raid_id,
        caller_id: caller_id.to_string(),
        granted_at,
    };

    sqlx::query("INSERT INTO mor_status (id, player_id, raid_id, caller_id, date) VALUES (?, ?, ?, ?, ?)")
        .bind(record.id.to_string())
        .bind(player_id.to_string())
        .bind(raid_id.to_string())
        .bind(caller_id)
        .bind(to_db(&granted_at))
        .execute(executor)
        .await?;

    Ok(record)
}

pub async fn find_for_player<'e, E>(executor: E, player_id: Uuid) -> Result<Option<PriorityRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, player_id, raid_id, caller_id, date FROM mor_status WHERE player_id = ?")
        .bind(player_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

pub async fn delete_for_player<'e, E>(executor: E, player_id: Uuid) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM mor_status WHERE player_id = ?")
        .bind(player_id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Delete every record attributed to a raid
pub async fn delete_for_raid<'e, E>(executor: E, raid_id: Uuid) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM mor_status WHERE raid_id = ?")
        .bind(raid_id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Delete records of a raid whose registration no longer carries the flag
pub async fn delete_orphaned_for_raid<'e, E>(executor: E, raid_id: Uuid) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM mor_status
        WHERE raid_id = ?
          AND NOT EXISTS (
              SELECT 1 FROM raid_registrations rr
              WHERE rr.raid_id = mor_status.raid_id
                AND rr.player_id = mor_status.player_id
                AND rr.mor = 1
                AND rr.selected = 0
          )
        "#,
    )
    .bind(raid_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Every active record, newest first
pub async fn list_records(pool: &SqlitePool) -> Result<Vec<PriorityRecordView>> {
    let rows = sqlx::query(
        r#"
        SELECT ms.id, ms.player_id, ms.raid_id, ms.caller_id, ms.date,
               p.name AS player_name, r.title AS raid_title, c.name AS caller_name,
               rr.role, rr.secondary_role, rr.ip
        FROM mor_status ms
        JOIN players p ON p.id = ms.player_id
        JOIN raids r ON r.id = ms.raid_id
        LEFT JOIN callers c ON c.discord_id = ms.caller_id
        LEFT JOIN raid_registrations rr ON rr.raid_id = ms.raid_id AND rr.player_id = ms.player_id
        ORDER BY ms.date DESC, p.name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let role: Option<String> = row.try_get("role")?;
            let secondary_role: Option<String> = row.try_get("secondary_role")?;
            Ok(PriorityRecordView {
                record: record_from_row(row)?,
                player_name: row.try_get("player_name")?,
                raid_title: row.try_get("raid_title")?,
                caller_name: row.try_get("caller_name")?,
                role: role.as_deref().map(|r| parse_role("raid_registrations.role", r)).transpose()?,
                secondary_role: secondary_role
                    .as_deref()
                    .map(|r| parse_role("raid_registrations.secondary_role", r))
                    .transpose()?,
                gear_level: row.try_get("ip")?,
            })
        })
        .collect()
}
