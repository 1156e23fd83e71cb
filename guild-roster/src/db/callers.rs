//! Caller persistence

use guild_common::config::CallerSeed;
use guild_common::db::Caller;
use guild_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

fn caller_from_row(row: &SqliteRow) -> Result<Caller> {
    let id: String = row.try_get("id")?;
    Ok(Caller {
        id: parse_uuid("callers.id", &id)?,
        discord_id: row.try_get("discord_id")?,
        name: row.try_get("name")?,
        avatar_url: row.try_get("avatar_url")?,
    })
}

/// Load caller by external identity
pub async fn find_by_discord_id<'e, E>(executor: E, discord_id: &str) -> Result<Option<Caller>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, discord_id, name, avatar_url FROM callers WHERE discord_id = ?")
        .bind(discord_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(caller_from_row).transpose()
}

/// Resolve the caller or create it with `name` if absent
///
/// An existing caller keeps its display name.
pub async fn ensure_caller(
    conn: &mut SqliteConnection,
    discord_id: &str,
    name: &str,
) -> Result<Caller> {
    sqlx::query(
        r#"
        INSERT INTO callers (id, discord_id, name)
        VALUES (?, ?, ?)
        ON CONFLICT(discord_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(discord_id)
    .bind(name)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query("SELECT id, discord_id, name, avatar_url FROM callers WHERE discord_id = ?")
        .bind(discord_id)
        .fetch_one(&mut *conn)
        .await?;

    caller_from_row(&row)
}

/// Insert or refresh a caller from configuration
pub async fn upsert_caller<'e, E>(executor: E, seed: &CallerSeed) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO callers (id, discord_id, name, avatar_url)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(discord_id) DO UPDATE SET
            name = excluded.name,
            avatar_url = excluded.avatar_url
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&seed.discord_id)
    .bind(&seed.name)
    .bind(&seed.avatar_url)
    .execute(executor)
    .await?;

    Ok(())
}

/// Upsert every configured caller, returning how many were written
pub async fn seed_callers(pool: &SqlitePool, seeds: &[CallerSeed]) -> Result<usize> {
    let mut tx = super::begin_write(pool).await?;
    for seed in seeds {
        upsert_caller(&mut *tx, seed).await?;
    }
    tx.commit().await?;
    Ok(seeds.len())
}

/// All callers ordered by name
pub async fn list_callers(pool: &SqlitePool) -> Result<Vec<Caller>> {
    let rows = sqlx::query("SELECT id, discord_id, name, avatar_url FROM callers ORDER BY name")
        .fetch_all(pool)
        .await?;

    rows.iter().map(caller_from_row).collect()
}
