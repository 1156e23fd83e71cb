//! Settings database operations
//!
//! Get/set accessors over the `settings` key-value table.

use guild_common::{Error, Result};
use sqlx::{Pool, Sqlite};

const RAID_HELPER_API_KEY: &str = "raid_helper_api_key";

/// Raid Helper API key stored from the settings UI, if any
pub async fn get_raid_helper_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, RAID_HELPER_API_KEY).await
}

pub async fn set_raid_helper_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, RAID_HELPER_API_KEY, key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row.and_then(|(value,)| value) {
        Some(value) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}
