//! Player persistence and identity resolution
//!
//! Players with an external identity are matched by that identity only.
//! Name-only players form a separate "unverified" class matched by display
//! name among themselves. The two classes are never merged.

use guild_common::db::Player;
use guild_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;

fn player_from_row(row: &SqliteRow) -> Result<Player> {
    let id: String = row.try_get("id")?;
    Ok(Player {
        id: parse_uuid("players.id", &id)?,
        name: row.try_get("name")?,
        discord_id: row.try_get("discord_id")?,
    })
}

/// Find the player for a signup, creating it if absent
///
/// A verified player's display name is refreshed when it changed.
pub async fn resolve_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    discord_id: Option<&str>,
) -> Result<Player> {
    let name = name.trim();

    let existing = match discord_id {
        Some(ext) => sqlx::query("SELECT id, name, discord_id FROM players WHERE discord_id = ?")
            .bind(ext)
            .fetch_optional(&mut *conn)
            .await?,
        None => sqlx::query(
            "SELECT id, name, discord_id FROM players WHERE name = ? AND discord_id IS NULL",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?,
    };

    if let Some(row) = existing {
        let mut player = player_from_row(&row)?;
        if player.discord_id.is_some() && player.name != name {
            sqlx::query("UPDATE players SET name = ? WHERE id = ?")
                .bind(name)
                .bind(player.id.to_string())
                .execute(&mut *conn)
                .await?;
            player.name = name.to_string();
        }
        return Ok(player);
    }

    let player = Player {
        id: Uuid::new_v4(),
        name: name.to_string(),
        discord_id: discord_id.map(str::to_string),
    };

    sqlx::query("INSERT INTO players (id, name, discord_id) VALUES (?, ?, ?)")
        .bind(player.id.to_string())
        .bind(&player.name)
        .bind(&player.discord_id)
        .execute(&mut *conn)
        .await?;

    Ok(player)
}
