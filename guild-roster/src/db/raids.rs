//! Raid persistence

use chrono::{DateTime, Utc};
use guild_common::db::Raid;
use guild_common::time::{from_db, to_db};
use guild_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

const RAID_COLUMNS: &str =
    "id, raid_helper_id, title, description, date, caller_id, caller_name, image_url, last_synced";

/// Fields written on every sync of an external event
#[derive(Debug, Clone)]
pub struct SyncedRaid<'a> {
    pub raid_helper_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub date: DateTime<Utc>,
    pub caller_id: &'a str,
    pub caller_name: &'a str,
    pub image_url: Option<&'a str>,
    pub synced_at: DateTime<Utc>,
}

/// Fields of a raid created from the caller UI
#[derive(Debug, Clone)]
pub struct NewRaid {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub caller_id: String,
    pub caller_name: String,
    pub image_url: Option<String>,
}

/// Whether an upsert inserted or updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Inserted,
    Updated,
}

/// Raid with its registration count
#[derive(Debug, Clone, Serialize)]
pub struct RaidSummary {
    #[serde(flatten)]
    pub raid: Raid,
    pub participants_count: i64,
}

pub(crate) fn raid_from_row(row: &SqliteRow) -> Result<Raid> {
    let id: String = row.try_get("id")?;
    let date: String = row.try_get("date")?;
    let last_synced: Option<String> = row.try_get("last_synced")?;

    Ok(Raid {
        id: parse_uuid("raids.id", &id)?,
        raid_helper_id: row.try_get("raid_helper_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date: from_db(&date)?,
        caller_id: row.try_get("caller_id")?,
        caller_name: row.try_get("caller_name")?,
        image_url: row.try_get("image_url")?,
        last_synced: last_synced.as_deref().map(from_db).transpose()?,
    })
}

/// Load raid by primary key
pub async fn get_raid<'e, E>(executor: E, raid_id: Uuid) -> Result<Option<Raid>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM raids WHERE id = ?", RAID_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(raid_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(raid_from_row).transpose()
}

/// Load raid by Raid Helper event id
pub async fn find_by_external_id<'e, E>(executor: E, raid_helper_id: &str) -> Result<Option<Raid>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM raids WHERE raid_helper_id = ?", RAID_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(raid_helper_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(raid_from_row).transpose()
}

/// Insert or update the raid keyed by its external id
///
/// Returns the local raid id and whether the row was created.
pub async fn upsert_synced(
    conn: &mut SqliteConnection,
    raid: &SyncedRaid<'_>,
) -> Result<(Uuid, UpsertKind)> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM raids WHERE raid_helper_id = ?")
        .bind(raid.raid_helper_id)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE raids SET
                    title = ?,
                    description = ?,
                    date = ?,
                    caller_id = ?,
                    caller_name = ?,
                    image_url = ?,
                    last_synced = ?
                WHERE id = ?
                "#,
            )
            .bind(raid.title)
            .bind(raid.description)
            .bind(to_db(&raid.date))
            .bind(raid.caller_id)
            .bind(raid.caller_name)
            .bind(raid.image_url)
            .bind(to_db(&raid.synced_at))
            .bind(&id)
            .execute(&mut *conn)
            .await?;

            Ok((parse_uuid("raids.id", &id)?, UpsertKind::Updated))
        }
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO raids (id, raid_helper_id, title, description, date, caller_id, caller_name, image_url, last_synced)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id.to_string())
            .bind(raid.raid_helper_id)
            .bind(raid.title)
            .bind(raid.description)
            .bind(to_db(&raid.date))
            .bind(raid.caller_id)
            .bind(raid.caller_name)
            .bind(raid.image_url)
            .bind(to_db(&raid.synced_at))
            .execute(&mut *conn)
            .await?;

            Ok((id, UpsertKind::Inserted))
        }
    }
}

/// Insert a manually created raid (no external id, never synced)
pub async fn insert_manual<'e, E>(executor: E, raid: &NewRaid) -> Result<Raid>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO raids (id, raid_helper_id, title, description, date, caller_id, caller_name, image_url, last_synced)
        VALUES (?, NULL, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(id.to_string())
    .bind(&raid.title)
    .bind(&raid.description)
    .bind(to_db(&raid.date))
    .bind(&raid.caller_id)
    .bind(&raid.caller_name)
    .bind(&raid.image_url)
    .execute(executor)
    .await?;

    Ok(Raid {
        id,
        raid_helper_id: None,
        title: raid.title.clone(),
        description: raid.description.clone(),
        date: raid.date,
        caller_id: raid.caller_id.clone(),
        caller_name: Some(raid.caller_name.clone()),
        image_url: raid.image_url.clone(),
        last_synced: None,
    })
}

/// Raids owned by a caller, scheduled time ascending
pub async fn list_for_caller(pool: &SqlitePool, caller_id: &str) -> Result<Vec<RaidSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.raid_helper_id, r.title, r.description, r.date, r.caller_id,
               r.caller_name, r.image_url, r.last_synced,
               (SELECT COUNT(*) FROM raid_registrations rr WHERE rr.raid_id = r.id) AS participants_count
        FROM raids r
        WHERE r.caller_id = ?
        ORDER BY r.date ASC, r.title ASC
        "#,
    )
    .bind(caller_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(RaidSummary {
                raid: raid_from_row(row)?,
                participants_count: row.try_get("participants_count")?,
            })
        })
        .collect()
}
